// ABOUTME: Protocol error taxonomy with RFC 6749/7009/7662 error codes
// ABOUTME: Maps each tagged failure 1:1 to an HTTP status and JSON body
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Every protocol violation is a structured, typed failure returned to the
//! caller; the HTTP boundary maps tags to status codes and
//! `{error, error_description}` bodies. Nothing here is retried and nothing
//! is surfaced as a generic failure. Revocation is the one deliberate
//! exception: its internal failure modes collapse to success at the service
//! layer and never reach this type.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tagged protocol failure returned from every authorization service
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    /// Unknown client id or failed secret authentication at the token
    /// endpoint.
    #[error("Client authentication failed")]
    InvalidClient,

    /// Bad/expired/consumed code, redirect mismatch, bad PKCE verifier, or
    /// bad/expired/revoked refresh token.
    #[error("{0}")]
    InvalidGrant(String),

    /// Requested scope outside the client's allowed set, or a refresh
    /// attempting scope expansion.
    #[error("{0}")]
    InvalidScope(String),

    /// Any grant_type other than authorization_code or refresh_token.
    #[error("Grant type not supported")]
    UnsupportedGrantType,

    /// Redirect URI not registered for the client, surfaced during
    /// authorize before any redirect occurs.
    #[error("Redirect URI is not registered for this client")]
    RedirectUriNotAllowed,

    /// Unknown or suspended client at the authorize endpoint, where no
    /// client authentication takes place.
    #[error("Unknown or inactive client")]
    UnknownClient,

    /// Malformed or missing parameters at the HTTP boundary.
    #[error("{0}")]
    InvalidRequest(String),
}

impl OAuthError {
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::InvalidGrant(description.into())
    }

    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::InvalidScope(description.into())
    }

    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest(description.into())
    }

    /// The RFC error code serialized into the `error` field.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::RedirectUriNotAllowed => "redirect_uri_not_allowed",
            Self::UnknownClient => "unknown_client",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidClient => StatusCode::UNAUTHORIZED,
            Self::InvalidGrant(_)
            | Self::InvalidScope(_)
            | Self::UnsupportedGrantType
            | Self::RedirectUriNotAllowed
            | Self::UnknownClient
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Serialized `{error, error_description}` body (RFC 6749 §5.2).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl From<&OAuthError> for ErrorBody {
    fn from(error: &OAuthError) -> Self {
        Self {
            error: error.error_code().to_owned(),
            error_description: Some(error.to_string()),
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(&self);
        (self.http_status(), Json(body)).into_response()
    }
}
