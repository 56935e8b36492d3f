// ABOUTME: Persistence seam for clients, authorization codes, and token pairs
// ABOUTME: Defines the atomic conditional-update contract backends must honor
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage abstraction for the authorization server.
//!
//! The trait is the collaborator contract the surrounding system provides:
//! a store offering atomic conditional-update/delete on individual records.
//! The two `consume_*` operations are the load-bearing ones — they must be
//! atomic per record so that concurrent exchanges of the same code, or
//! concurrent refreshes of the same token, have at most one winner. A
//! read-then-write implementation is a correctness bug, not a style issue.

/// In-memory implementation with per-record atomic operations
pub mod memory;

pub use memory::MemoryStore;

use crate::models::{AccessToken, AuthorizationCode, Client, RefreshToken};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Backend storage for the client, code, and token stores.
#[async_trait]
pub trait OAuthStore: Send + Sync {
    // -- clients ----------------------------------------------------------

    async fn insert_client(&self, client: &Client) -> Result<()>;

    async fn client_by_public_id(&self, client_id: &str) -> Result<Option<Client>>;

    /// Atomically replace the stored secret hash. Returns `false` when the
    /// client does not exist. The old secret must stop verifying the moment
    /// this returns.
    async fn update_secret_hash(&self, client_id: &str, secret_hash: &str) -> Result<bool>;

    // -- authorization codes ----------------------------------------------

    async fn insert_code(&self, code: &AuthorizationCode) -> Result<()>;

    /// Atomically consume an authorization code: remove it only if it
    /// exists, is unexpired at `now`, and was issued to `client_id` with
    /// exactly `redirect_uri`. Returns the record for the single winner;
    /// every other caller (including replays after success) gets `None`.
    async fn consume_code(
        &self,
        value: &str,
        client_id: &str,
        redirect_uri: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationCode>>;

    // -- tokens -----------------------------------------------------------

    /// Persist a freshly minted access+refresh pair.
    async fn insert_token_pair(&self, access: &AccessToken, refresh: &RefreshToken) -> Result<()>;

    async fn access_token(&self, value: &str) -> Result<Option<AccessToken>>;

    async fn refresh_token(&self, value: &str) -> Result<Option<RefreshToken>>;

    /// Atomically revoke a refresh token for rotation: mark it revoked only
    /// if it belongs to `client_id` and is live at `now`, returning the
    /// pre-revocation record. `None` for everyone who loses the race or
    /// presents a dead token.
    async fn consume_refresh_token(
        &self,
        value: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>>;

    /// Mark an access token revoked if it is owned by `client_id`. Returns
    /// whether a record was updated; callers that must not leak existence
    /// ignore the result.
    async fn revoke_access_token(&self, value: &str, client_id: &str) -> Result<bool>;

    /// Mark a refresh token revoked if it is owned by `client_id`.
    async fn revoke_refresh_token(&self, value: &str, client_id: &str) -> Result<bool>;
}
