// ABOUTME: OAuth 2.0 domain records and wire request/response types
// ABOUTME: Covers clients, authorization codes, token pairs, and RFC 7662 bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Registered client application status. Suspended clients fail every
/// protocol operation; clients are never deleted while tokens reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Suspended,
}

/// A registered client application.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Uuid,
    /// Public opaque identifier, prefixed `app_`.
    pub client_id: String,
    /// Salted one-way hash; the plaintext secret is never stored.
    pub secret_hash: String,
    pub name: String,
    /// Exact-match absolute redirect URIs.
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: BTreeSet<String>,
    pub status: ClientStatus,
    pub description: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }
}

/// PKCE code challenge method (RFC 7636).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    S256,
    Plain,
}

impl PkceMethod {
    /// Parse the `code_challenge_method` parameter. `None` defaults to S256
    /// when a challenge is present.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        match param {
            None | Some("S256") => Some(Self::S256),
            Some("plain") => Some(Self::Plain),
            Some(_) => None,
        }
    }
}

/// A short-lived single-use authorization code.
///
/// Consumption is terminal: the store removes the record atomically, so a
/// second exchange of the same value observes it as already consumed.
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub value: String,
    pub client_id: String,
    pub tenant_id: String,
    pub granted_scopes: BTreeSet<String>,
    /// The redirect URI presented at authorize time; the exchange must
    /// byte-match it.
    pub redirect_uri: String,
    pub pkce_challenge: Option<String>,
    pub pkce_method: Option<PkceMethod>,
    pub expires_at: DateTime<Utc>,
}

/// A bearer access token. Created only as half of a token pair.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub client_id: String,
    pub tenant_id: String,
    pub scopes: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl AccessToken {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// A long-lived refresh token, paired 1:1 with an access token at issuance.
/// Rotated (revoked and replaced) on every refresh.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub value: String,
    pub client_id: String,
    pub tenant_id: String,
    /// Ceiling for any future refresh; a rotated pair may narrow but never
    /// expand this set.
    pub scopes: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Authorization request (`GET`/`POST /oauth/authorize`).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRequest {
    pub client_id: String,
    pub redirect_uri: String,
    /// Space-delimited requested scopes; empty grants the client's full
    /// allowed set.
    pub scope: Option<String>,
    pub tenant_id: String,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Consent-display projection of a client: the only client metadata an
/// unauthenticated caller ever sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentClient {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
}

/// Successful authorization response: the minted code plus consent data.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub code: String,
    pub scopes: Vec<String>,
    pub client: ConsentClient,
    /// Seconds until the code expires.
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Token endpoint request (`POST /oauth/token`, form-encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    /// Body-field credentials; HTTP Basic is accepted interchangeably.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub code_verifier: Option<String>,
}

/// Token endpoint success response (RFC 6749 §5.1).
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

/// Revocation request (`POST /oauth/revoke`, RFC 7009).
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Introspection request (`POST /oauth/introspect`, RFC 7662).
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectRequest {
    pub token: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Introspection response (RFC 7662 §2.2). Inactive tokens carry no other
/// fields, so cross-client probes learn nothing.
#[derive(Debug, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl IntrospectionResponse {
    /// The `{active: false}` body with no other fields.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            token_type: None,
            exp: None,
            iat: None,
        }
    }
}

/// Client registration request (`POST /oauth/register`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistrationRequest {
    pub name: String,
    pub redirect_uris: Vec<String>,
    /// Space-delimited scopes the client may request.
    pub scope: String,
    pub description: Option<String>,
    pub website: Option<String>,
}

/// Client registration response. The only place the plaintext secret ever
/// appears.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub scope: String,
    pub client_id_issued_at: i64,
}
