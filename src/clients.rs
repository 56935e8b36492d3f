// ABOUTME: Client store manager covering registration, secret verification, and rotation
// ABOUTME: Plaintext secrets are returned exactly once and only the salted hash persists
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::crypto::{verify_secret, PlaintextSecret, SecretFactory};
use crate::errors::OAuthError;
use crate::models::{Client, ClientStatus};
use crate::scopes::ScopeRegistry;
use crate::store::OAuthStore;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Inputs for registering a client application.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: BTreeSet<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

/// Manages registered client applications.
pub struct ClientManager {
    store: Arc<dyn OAuthStore>,
    secrets: Arc<SecretFactory>,
    registry: Arc<ScopeRegistry>,
}

impl ClientManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn OAuthStore>,
        secrets: Arc<SecretFactory>,
        registry: Arc<ScopeRegistry>,
    ) -> Self {
        Self {
            store,
            secrets,
            registry,
        }
    }

    /// Register a client: generates the public id and a high-entropy
    /// secret, persists only the hash, and returns the plaintext exactly
    /// once. It is never retrievable again.
    ///
    /// # Errors
    /// `invalid_request` for malformed redirect URIs, `invalid_scope` for
    /// scopes the registry does not know.
    pub async fn create(
        &self,
        spec: ClientSpec,
    ) -> Result<(Client, PlaintextSecret), OAuthError> {
        if spec.redirect_uris.is_empty() {
            return Err(OAuthError::invalid_request(
                "At least one redirect_uri is required",
            ));
        }
        for uri in &spec.redirect_uris {
            if !is_valid_redirect_uri(uri) {
                return Err(OAuthError::invalid_request(format!(
                    "Invalid redirect_uri: {uri}"
                )));
            }
        }
        for scope in &spec.allowed_scopes {
            if !self.registry.contains(scope) {
                return Err(OAuthError::invalid_scope(format!(
                    "Unknown scope: {scope}"
                )));
            }
        }

        let secret = self.secrets.client_secret().map_err(|e| {
            tracing::error!("Secret generation failed during client registration: {e:#}");
            OAuthError::invalid_request("Failed to generate client credentials")
        })?;
        let secret_hash = self.secrets.hash_secret(secret.expose()).map_err(|e| {
            tracing::error!("Secret hashing failed during client registration: {e:#}");
            OAuthError::invalid_request("Failed to generate client credentials")
        })?;

        let client = Client {
            id: Uuid::new_v4(),
            client_id: self.secrets.client_public_id(),
            secret_hash,
            name: spec.name,
            redirect_uris: spec.redirect_uris,
            allowed_scopes: spec.allowed_scopes,
            status: ClientStatus::Active,
            description: spec.description,
            website: spec.website,
            created_at: Utc::now(),
        };

        self.store.insert_client(&client).await.map_err(|e| {
            tracing::error!(client_id = %client.client_id, "Failed to store client: {e:#}");
            OAuthError::invalid_request("Failed to store client registration")
        })?;

        tracing::info!(client_id = %client.client_id, "Registered client application");
        Ok((client, secret))
    }

    /// Look up a client by its public id. Unknown clients are a
    /// caller-visible condition, not an error.
    ///
    /// # Errors
    /// `invalid_request` only for storage failure.
    pub async fn find_by_public_id(&self, client_id: &str) -> Result<Option<Client>, OAuthError> {
        self.store
            .client_by_public_id(client_id)
            .await
            .map_err(|e| {
                tracing::error!(client_id, "Client lookup failed: {e:#}");
                OAuthError::invalid_request("Client lookup failed")
            })
    }

    /// Constant-time verification of a candidate secret against the stored
    /// hash.
    #[must_use]
    pub fn verify_secret(&self, client: &Client, candidate: &str) -> bool {
        verify_secret(&client.secret_hash, candidate)
    }

    /// Rotate a client's secret. The old secret stops verifying the moment
    /// the stored hash is replaced.
    ///
    /// # Errors
    /// `unknown_client` when no such client exists.
    pub async fn rotate_secret(&self, client_id: &str) -> Result<PlaintextSecret, OAuthError> {
        let secret = self.secrets.client_secret().map_err(|e| {
            tracing::error!(client_id, "Secret generation failed during rotation: {e:#}");
            OAuthError::invalid_request("Failed to generate client credentials")
        })?;
        let secret_hash = self.secrets.hash_secret(secret.expose()).map_err(|e| {
            tracing::error!(client_id, "Secret hashing failed during rotation: {e:#}");
            OAuthError::invalid_request("Failed to generate client credentials")
        })?;

        let updated = self
            .store
            .update_secret_hash(client_id, &secret_hash)
            .await
            .map_err(|e| {
                tracing::error!(client_id, "Failed to store rotated secret: {e:#}");
                OAuthError::invalid_request("Failed to rotate client secret")
            })?;
        if !updated {
            return Err(OAuthError::UnknownClient);
        }

        tracing::info!(client_id, "Rotated client secret");
        Ok(secret)
    }

    /// Authenticate a client with its id and secret, as the token endpoint
    /// requires. Unknown id, suspended status, and bad secret all collapse
    /// to `invalid_client` so callers cannot probe for registered ids.
    ///
    /// # Errors
    /// `invalid_client` on any authentication failure.
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Client, OAuthError> {
        let client = self
            .find_by_public_id(client_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(client_id, "Authentication failed: unknown client");
                OAuthError::InvalidClient
            })?;

        if !client.is_active() {
            tracing::warn!(client_id, "Authentication failed: client suspended");
            return Err(OAuthError::InvalidClient);
        }
        if !self.verify_secret(&client, client_secret) {
            tracing::warn!(client_id, "Authentication failed: bad secret");
            return Err(OAuthError::InvalidClient);
        }

        Ok(client)
    }
}

/// Redirect URIs must be absolute; plain HTTP is allowed only for loopback
/// development hosts.
fn is_valid_redirect_uri(uri: &str) -> bool {
    uri.starts_with("https://")
        || uri.starts_with("http://localhost")
        || uri.starts_with("http://127.0.0.1")
}
