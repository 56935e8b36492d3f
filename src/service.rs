// ABOUTME: Authorization service orchestrating authorize, exchange, refresh, revoke, introspect
// ABOUTME: Owns invariant enforcement; every protocol violation is a typed OAuthError
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::clients::ClientManager;
use crate::config::TokenTtls;
use crate::crypto::{verify_pkce, SecretFactory};
use crate::errors::OAuthError;
use crate::models::{
    AccessToken, AuthorizationCode, AuthorizeRequest, AuthorizeResponse, Client, ConsentClient,
    IntrospectionResponse, PkceMethod, RefreshToken, TokenRequest, TokenResponse,
};
use crate::scopes::{join_scopes, parse_scope_param, ScopeRegistry};
use crate::store::OAuthStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Client credentials presented at the token/revoke/introspect endpoints,
/// resolved from either body fields or HTTP Basic — both behave identically.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// The OAuth 2.0 authorization server core.
pub struct AuthorizationService {
    store: Arc<dyn OAuthStore>,
    clients: Arc<ClientManager>,
    registry: Arc<ScopeRegistry>,
    secrets: Arc<SecretFactory>,
    ttls: TokenTtls,
}

impl AuthorizationService {
    #[must_use]
    pub fn new(
        store: Arc<dyn OAuthStore>,
        clients: Arc<ClientManager>,
        registry: Arc<ScopeRegistry>,
        secrets: Arc<SecretFactory>,
        ttls: TokenTtls,
    ) -> Self {
        Self {
            store,
            clients,
            registry,
            secrets,
            ttls,
        }
    }

    /// Handle an authorization request: validate client, redirect URI, and
    /// scopes in that order (first failure wins), then mint a single-use
    /// code. The response carries the consent projection of the client —
    /// the only client metadata an unauthenticated caller ever sees.
    ///
    /// # Errors
    /// `unknown_client`, `redirect_uri_not_allowed`, or `invalid_scope`
    /// per the validation order; `invalid_request` for malformed PKCE
    /// parameters.
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
    ) -> Result<AuthorizeResponse, OAuthError> {
        let client = self
            .clients
            .find_by_public_id(&request.client_id)
            .await?
            .filter(Client::is_active)
            .ok_or_else(|| {
                tracing::warn!(client_id = %request.client_id, "Authorize rejected: unknown or suspended client");
                OAuthError::UnknownClient
            })?;

        // Byte-exact membership; prefix or case-folded matches are not
        // acceptable against open-redirect abuse.
        if !client
            .redirect_uris
            .iter()
            .any(|uri| uri == &request.redirect_uri)
        {
            tracing::warn!(client_id = %client.client_id, "Authorize rejected: unregistered redirect_uri");
            return Err(OAuthError::RedirectUriNotAllowed);
        }

        let granted_scopes = self.resolve_requested_scopes(&client, request.scope.as_deref())?;

        let (pkce_challenge, pkce_method) = validate_pkce_params(
            request.code_challenge.as_deref(),
            request.code_challenge_method.as_deref(),
        )?;

        let value = self.secrets.opaque_value().map_err(|e| {
            tracing::error!("Code generation failed: {e:#}");
            OAuthError::invalid_request("Failed to generate authorization code")
        })?;
        let code = AuthorizationCode {
            value,
            client_id: client.client_id.clone(),
            tenant_id: request.tenant_id,
            granted_scopes: granted_scopes.clone(),
            redirect_uri: request.redirect_uri,
            pkce_challenge,
            pkce_method,
            expires_at: Utc::now() + self.ttls.auth_code(),
        };
        self.store.insert_code(&code).await.map_err(|e| {
            tracing::error!(client_id = %client.client_id, "Failed to store authorization code: {e:#}");
            OAuthError::invalid_request("Failed to store authorization code")
        })?;

        tracing::info!(client_id = %client.client_id, "Issued authorization code");
        Ok(AuthorizeResponse {
            code: code.value,
            scopes: granted_scopes.into_iter().collect(),
            client: ConsentClient {
                name: client.name,
                description: client.description,
                website: client.website,
            },
            expires_in: self.ttls.auth_code().num_seconds(),
            state: request.state,
        })
    }

    /// Token endpoint dispatch. Client authentication happens once here,
    /// before the grant handlers run.
    ///
    /// # Errors
    /// `invalid_client` on authentication failure,
    /// `unsupported_grant_type` for anything but the two supported grants,
    /// plus the grant handlers' errors.
    pub async fn token(
        &self,
        request: TokenRequest,
        credentials: ClientCredentials,
    ) -> Result<TokenResponse, OAuthError> {
        let client = self
            .clients
            .authenticate(&credentials.client_id, &credentials.client_secret)
            .await?;

        match request.grant_type.as_str() {
            "authorization_code" => self.exchange_code(request, &client).await,
            "refresh_token" => self.refresh(request, &client).await,
            _ => Err(OAuthError::UnsupportedGrantType),
        }
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// Consumption is atomic: of two concurrent exchanges of the same code
    /// at most one wins, and the loser observes the code as already
    /// consumed. PKCE verification runs after consumption so a failed
    /// verifier still burns the code.
    async fn exchange_code(
        &self,
        request: TokenRequest,
        client: &Client,
    ) -> Result<TokenResponse, OAuthError> {
        let code = request
            .code
            .ok_or_else(|| OAuthError::invalid_request("Missing authorization code"))?;
        let redirect_uri = request
            .redirect_uri
            .ok_or_else(|| OAuthError::invalid_request("Missing redirect_uri"))?;

        let consumed = self
            .store
            .consume_code(&code, &client.client_id, &redirect_uri, Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(client_id = %client.client_id, "Code consumption failed: {e:#}");
                OAuthError::invalid_grant("Failed to consume authorization code")
            })?
            .ok_or_else(|| {
                tracing::warn!(
                    client_id = %client.client_id,
                    "Exchange rejected: code not found, consumed, expired, or mismatched"
                );
                OAuthError::invalid_grant("Authorization code is invalid or expired")
            })?;

        verify_code_pkce(&consumed, request.code_verifier.as_deref(), &client.client_id)?;

        let response = self
            .issue_token_pair(&client.client_id, &consumed.tenant_id, consumed.granted_scopes)
            .await?;
        tracing::info!(client_id = %client.client_id, "Exchanged authorization code for token pair");
        Ok(response)
    }

    /// Rotate a refresh token: validate, check any requested narrowing
    /// against the original scope set, then atomically revoke-and-reissue.
    /// Scope checks run before consumption so a rejected expansion attempt
    /// does not burn the presented token.
    async fn refresh(
        &self,
        request: TokenRequest,
        client: &Client,
    ) -> Result<TokenResponse, OAuthError> {
        let presented = request
            .refresh_token
            .ok_or_else(|| OAuthError::invalid_request("Missing refresh_token"))?;

        let now = Utc::now();
        let current = self
            .store
            .refresh_token(&presented)
            .await
            .map_err(|e| {
                tracing::error!(client_id = %client.client_id, "Refresh token lookup failed: {e:#}");
                OAuthError::invalid_grant("Refresh token is invalid or expired")
            })?
            .filter(|t| t.client_id == client.client_id && t.is_valid_at(now))
            .ok_or_else(|| {
                tracing::warn!(
                    client_id = %client.client_id,
                    "Refresh rejected: token not found, revoked, expired, or mismatched client"
                );
                OAuthError::invalid_grant("Refresh token is invalid or expired")
            })?;

        let next_scopes = match request.scope.as_deref() {
            Some(param) if !param.trim().is_empty() => {
                let requested = parse_scope_param(param);
                for scope in &requested {
                    if !self.registry.has_scope(&current.scopes, scope) {
                        tracing::warn!(
                            client_id = %client.client_id,
                            scope,
                            "Refresh rejected: scope expansion attempt"
                        );
                        return Err(OAuthError::invalid_scope("Cannot expand scopes on refresh"));
                    }
                }
                requested
            }
            _ => current.scopes.clone(),
        };

        // Atomic revoke-then-reissue: the entry-level guard in the store
        // ensures a refresh token is never live in two generations.
        let consumed = self
            .store
            .consume_refresh_token(&presented, &client.client_id, now)
            .await
            .map_err(|e| {
                tracing::error!(client_id = %client.client_id, "Refresh token consumption failed: {e:#}");
                OAuthError::invalid_grant("Failed to consume refresh token")
            })?
            .ok_or_else(|| {
                OAuthError::invalid_grant("Refresh token is invalid or expired")
            })?;

        let response = self
            .issue_token_pair(&client.client_id, &consumed.tenant_id, next_scopes)
            .await?;
        tracing::info!(client_id = %client.client_id, "Rotated refresh token");
        Ok(response)
    }

    /// RFC 7009 revocation. After client authentication succeeds this never
    /// fails: not-found, wrong-client, and malformed tokens are all
    /// indistinguishable from success, so existence is never leaked.
    ///
    /// # Errors
    /// `invalid_client` only, when authentication itself fails.
    pub async fn revoke(
        &self,
        token: &str,
        token_type_hint: Option<&str>,
        credentials: ClientCredentials,
    ) -> Result<(), OAuthError> {
        let client = self
            .clients
            .authenticate(&credentials.client_id, &credentials.client_secret)
            .await?;

        // The hint only orders the lookup (RFC 7009 §2.1); a wrong hint
        // must not prevent revocation.
        let revoked = if token_type_hint == Some("refresh_token") {
            self.try_revoke_refresh(token, &client).await || self.try_revoke_access(token, &client).await
        } else {
            self.try_revoke_access(token, &client).await || self.try_revoke_refresh(token, &client).await
        };

        if revoked {
            tracing::info!(client_id = %client.client_id, "Revoked token");
        } else {
            tracing::debug!(client_id = %client.client_id, "Revocation no-op (unknown or foreign token)");
        }
        Ok(())
    }

    async fn try_revoke_access(&self, token: &str, client: &Client) -> bool {
        self.store
            .revoke_access_token(token, &client.client_id)
            .await
            .unwrap_or(false)
    }

    async fn try_revoke_refresh(&self, token: &str, client: &Client) -> bool {
        self.store
            .revoke_refresh_token(token, &client.client_id)
            .await
            .unwrap_or(false)
    }

    /// RFC 7662 introspection. Returns `{active: false}` with no other
    /// fields for anything the authenticating client is not entitled to
    /// see: unknown values, expired or revoked tokens, and other clients'
    /// tokens are all indistinguishable.
    ///
    /// # Errors
    /// `invalid_client` when authentication fails.
    pub async fn introspect(
        &self,
        token: &str,
        credentials: ClientCredentials,
    ) -> Result<IntrospectionResponse, OAuthError> {
        let client = self
            .clients
            .authenticate(&credentials.client_id, &credentials.client_secret)
            .await?;
        let now = Utc::now();

        if let Ok(Some(access)) = self.store.access_token(token).await {
            return Ok(introspection_of(
                &client,
                &access.client_id,
                access.is_valid_at(now),
                &access.scopes,
                access.expires_at,
                access.created_at,
            ));
        }
        if let Ok(Some(refresh)) = self.store.refresh_token(token).await {
            return Ok(introspection_of(
                &client,
                &refresh.client_id,
                refresh.is_valid_at(now),
                &refresh.scopes,
                refresh.expires_at,
                refresh.created_at,
            ));
        }
        Ok(IntrospectionResponse::inactive())
    }

    /// Internal validation hook for resource-server middleware: the token
    /// record when it exists, is unexpired, and is unrevoked; `None`
    /// otherwise so call sites can cheaply gate access.
    ///
    /// # Errors
    /// Storage failure only.
    pub async fn validate_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let now = Utc::now();
        Ok(self
            .store
            .access_token(token)
            .await?
            .filter(|t| t.is_valid_at(now)))
    }

    /// Every requested scope, after expansion, must be contained in the
    /// client's allowed set. An empty request grants the full allowed set.
    fn resolve_requested_scopes(
        &self,
        client: &Client,
        scope_param: Option<&str>,
    ) -> Result<BTreeSet<String>, OAuthError> {
        let requested = match scope_param {
            Some(param) if !param.trim().is_empty() => parse_scope_param(param),
            _ => return Ok(client.allowed_scopes.clone()),
        };
        for scope in &requested {
            if !self.registry.has_scope(&client.allowed_scopes, scope) {
                tracing::warn!(client_id = %client.client_id, scope, "Authorize rejected: scope not allowed");
                return Err(OAuthError::invalid_scope(format!(
                    "Scope not allowed for this client: {scope}"
                )));
            }
        }
        Ok(requested)
    }

    /// Mint and persist an access+refresh pair.
    async fn issue_token_pair(
        &self,
        client_id: &str,
        tenant_id: &str,
        scopes: BTreeSet<String>,
    ) -> Result<TokenResponse, OAuthError> {
        let mint = || {
            self.secrets.opaque_value().map_err(|e| {
                tracing::error!("Token generation failed: {e:#}");
                OAuthError::invalid_request("Failed to generate token")
            })
        };
        let access_value = mint()?;
        let refresh_value = mint()?;
        let now = Utc::now();

        let access = AccessToken {
            value: access_value,
            client_id: client_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            scopes: scopes.clone(),
            created_at: now,
            expires_at: now + self.ttls.access_token(),
            revoked: false,
        };
        let refresh = RefreshToken {
            value: refresh_value,
            client_id: client_id.to_owned(),
            tenant_id: tenant_id.to_owned(),
            scopes: scopes.clone(),
            created_at: now,
            expires_at: now + self.ttls.refresh_token(),
            revoked: false,
        };
        self.store
            .insert_token_pair(&access, &refresh)
            .await
            .map_err(|e| {
                tracing::error!(client_id, "Failed to store token pair: {e:#}");
                OAuthError::invalid_request("Failed to store tokens")
            })?;

        Ok(TokenResponse {
            access_token: access.value,
            refresh_token: refresh.value,
            token_type: "Bearer".to_owned(),
            expires_in: self.ttls.access_token().num_seconds(),
            scope: join_scopes(&scopes),
        })
    }
}

/// Build an introspection body, enforcing the cross-client confidentiality
/// invariant: another client's token is `{active: false}` even when live.
fn introspection_of(
    caller: &Client,
    owner_client_id: &str,
    live: bool,
    scopes: &BTreeSet<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> IntrospectionResponse {
    if owner_client_id != caller.client_id || !live {
        return IntrospectionResponse::inactive();
    }
    IntrospectionResponse {
        active: true,
        scope: Some(join_scopes(scopes)),
        client_id: Some(owner_client_id.to_owned()),
        token_type: Some("Bearer".to_owned()),
        exp: Some(expires_at.timestamp()),
        iat: Some(created_at.timestamp()),
    }
}

/// Validate authorize-time PKCE parameters (RFC 7636 §4.2).
fn validate_pkce_params(
    challenge: Option<&str>,
    method: Option<&str>,
) -> Result<(Option<String>, Option<PkceMethod>), OAuthError> {
    let Some(challenge) = challenge else {
        if method.is_some() {
            return Err(OAuthError::invalid_request(
                "code_challenge_method provided without code_challenge",
            ));
        }
        return Ok((None, None));
    };
    if challenge.len() < 43 || challenge.len() > 128 {
        return Err(OAuthError::invalid_request(
            "code_challenge must be between 43 and 128 characters",
        ));
    }
    let method = PkceMethod::from_param(method).ok_or_else(|| {
        OAuthError::invalid_request("code_challenge_method must be 'S256' or 'plain'")
    })?;
    Ok((Some(challenge.to_owned()), Some(method)))
}

/// Verify the code's PKCE binding after atomic consumption, so a failed
/// verifier still burns the code.
fn verify_code_pkce(
    code: &AuthorizationCode,
    verifier: Option<&str>,
    client_id: &str,
) -> Result<(), OAuthError> {
    let Some(challenge) = &code.pkce_challenge else {
        if verifier.is_some() {
            return Err(OAuthError::invalid_grant(
                "code_verifier provided but no code_challenge was issued",
            ));
        }
        return Ok(());
    };

    let verifier = verifier
        .ok_or_else(|| OAuthError::invalid_grant("code_verifier is required"))?;
    if verifier.len() < 43 || verifier.len() > 128 {
        return Err(OAuthError::invalid_grant(
            "code_verifier must be between 43 and 128 characters",
        ));
    }
    if !verifier
        .chars()
        .all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~'))
    {
        return Err(OAuthError::invalid_grant(
            "code_verifier contains invalid characters",
        ));
    }

    let method = code.pkce_method.unwrap_or(PkceMethod::S256);
    if verify_pkce(method, challenge, verifier) {
        Ok(())
    } else {
        tracing::warn!(client_id, "PKCE verification failed");
        Err(OAuthError::invalid_grant("Code verifier validation failed"))
    }
}
