// ABOUTME: DashMap-backed store with per-record atomic consume operations
// ABOUTME: Code consumption is delete-if-valid under the shard lock
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::OAuthStore;
use crate::models::{AccessToken, AuthorizationCode, Client, RefreshToken};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// In-memory store keyed by opaque value.
///
/// Atomicity discipline is per record: `remove_if` and `get_mut` hold the
/// shard/entry lock for the duration of the check-and-update, so two
/// requests racing on the same code or refresh token see exactly one
/// winner. Different records never contend beyond shard granularity.
#[derive(Default)]
pub struct MemoryStore {
    clients: DashMap<String, Client>,
    codes: DashMap<String, AuthorizationCode>,
    access_tokens: DashMap<String, AccessToken>,
    refresh_tokens: DashMap<String, RefreshToken>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthStore for MemoryStore {
    async fn insert_client(&self, client: &Client) -> Result<()> {
        self.clients
            .insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn client_by_public_id(&self, client_id: &str) -> Result<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.clone()))
    }

    async fn update_secret_hash(&self, client_id: &str, secret_hash: &str) -> Result<bool> {
        match self.clients.get_mut(client_id) {
            Some(mut client) => {
                client.secret_hash = secret_hash.to_owned();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_code(&self, code: &AuthorizationCode) -> Result<()> {
        self.codes.insert(code.value.clone(), code.clone());
        Ok(())
    }

    async fn consume_code(
        &self,
        value: &str,
        client_id: &str,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationCode>> {
        // remove_if evaluates the predicate under the shard lock, so the
        // winner removes the record in the same critical section that
        // validated it. A redirect or client mismatch leaves the code in
        // place for the legitimate holder.
        let removed = self.codes.remove_if(value, |_, code| {
            code.client_id == client_id && code.redirect_uri == redirect_uri && code.expires_at > now
        });
        Ok(removed.map(|(_, code)| code))
    }

    async fn insert_token_pair(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()> {
        self.access_tokens
            .insert(access.value.clone(), access.clone());
        self.refresh_tokens
            .insert(refresh.value.clone(), refresh.clone());
        Ok(())
    }

    async fn access_token(&self, value: &str) -> Result<Option<AccessToken>> {
        Ok(self.access_tokens.get(value).map(|t| t.clone()))
    }

    async fn refresh_token(&self, value: &str) -> Result<Option<RefreshToken>> {
        Ok(self.refresh_tokens.get(value).map(|t| t.clone()))
    }

    async fn consume_refresh_token(
        &self,
        value: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>> {
        // The entry guard spans the check and the revocation, so rotation
        // never leaves two live generations of the same token.
        let Some(mut token) = self.refresh_tokens.get_mut(value) else {
            return Ok(None);
        };
        if token.client_id != client_id || !token.is_valid_at(now) {
            return Ok(None);
        }
        let consumed = token.clone();
        token.revoked = true;
        Ok(Some(consumed))
    }

    async fn revoke_access_token(&self, value: &str, client_id: &str) -> Result<bool> {
        match self.access_tokens.get_mut(value) {
            Some(mut token) if token.client_id == client_id => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_refresh_token(&self, value: &str, client_id: &str) -> Result<bool> {
        match self.refresh_tokens.get_mut(value) {
            Some(mut token) if token.client_id == client_id => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
