// ABOUTME: Library entry point for the Vendia OAuth 2.0 authorization server
// ABOUTME: Authorization-code issuance with PKCE, token lifecycle, and hierarchical scopes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Vendia OAuth Server
//!
//! An OAuth 2.0 authorization server for a multi-tenant commerce platform.
//! Third-party client applications obtain delegated, scoped access to
//! merchant data through the authorization code grant (RFC 6749) with
//! optional PKCE (RFC 7636).
//!
//! ## Features
//!
//! - **Authorization code grant**: short-lived single-use codes, atomically
//!   consumed so replays and concurrent exchanges lose deterministically
//! - **Token lifecycle**: opaque access/refresh token pairs, refresh
//!   rotation, revocation (RFC 7009), and introspection (RFC 7662)
//! - **Hierarchical scopes**: `<resource>.manage` implies read and write,
//!   with `read_all` and `manage_all` composites
//! - **Client registry**: salted secret hashing, constant-time
//!   verification, secret rotation, and consent-screen projections
//!
//! ## Architecture
//!
//! - **Scopes**: the permission hierarchy and containment checks
//! - **Store**: the atomic conditional-update persistence seam
//! - **Service**: protocol decisions for every endpoint
//! - **Routes**: a thin axum HTTP surface over the service
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vendia_oauth_server::config::ServerConfig;
//!
//! let config = ServerConfig::from_env();
//! println!("OAuth server configured: {}", config.summary());
//! ```

/// Client application registration, authentication, and secret rotation
pub mod clients;
/// Environment-driven server configuration
pub mod config;
/// Random token minting, secret hashing, and PKCE primitives
pub mod crypto;
/// Protocol error taxonomy with RFC error codes and HTTP mapping
pub mod errors;
/// Structured logging setup
pub mod logging;
/// Domain records and wire request/response types
pub mod models;
/// Axum HTTP routes
pub mod routes;
/// Permission scope registry and hierarchy
pub mod scopes;
/// Authorization service: authorize, exchange, refresh, revoke, introspect
pub mod service;
/// Persistence seam with atomic consume operations
pub mod store;
