// ABOUTME: Axum HTTP surface for the authorization server endpoints
// ABOUTME: Discovery, scope catalog, authorize, token, revoke, introspect, register, health
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP routes for the authorization server.
//!
//! Handlers stay thin: parameter extraction and credential resolution here,
//! every protocol decision in [`crate::service::AuthorizationService`].
//! Client credentials at the token, revoke, and introspect endpoints are
//! accepted as body fields or HTTP Basic interchangeably.

use crate::config::ServerConfig;
use crate::errors::OAuthError;
use crate::models::{
    AuthorizeRequest, ClientRegistrationRequest, ClientRegistrationResponse, IntrospectRequest,
    RevokeRequest, TokenRequest,
};
use crate::scopes::{join_scopes, parse_scope_param, ScopeRegistry};
use crate::service::{AuthorizationService, ClientCredentials};
use crate::clients::{ClientManager, ClientSpec};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct ServerResources {
    pub service: AuthorizationService,
    pub clients: Arc<ClientManager>,
    pub registry: Arc<ScopeRegistry>,
    pub config: ServerConfig,
}

/// OAuth 2.0 endpoint routes
pub struct OAuthRoutes;

impl OAuthRoutes {
    /// Create all OAuth endpoint routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/.well-known/oauth-authorization-server",
                get(Self::handle_discovery),
            )
            .route("/oauth/scopes", get(Self::handle_scope_catalog))
            .route(
                "/oauth/authorize",
                get(Self::handle_authorize_query).post(Self::handle_authorize_json),
            )
            .route("/oauth/token", post(Self::handle_token))
            .route("/oauth/revoke", post(Self::handle_revoke))
            .route("/oauth/introspect", post(Self::handle_introspect))
            .route("/oauth/register", post(Self::handle_register))
            .with_state(resources)
    }

    /// RFC 8414 discovery metadata.
    async fn handle_discovery(
        State(resources): State<Arc<ServerResources>>,
    ) -> Json<serde_json::Value> {
        let issuer = &resources.config.issuer_url;
        Json(serde_json::json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/oauth/authorize"),
            "token_endpoint": format!("{issuer}/oauth/token"),
            "revocation_endpoint": format!("{issuer}/oauth/revoke"),
            "introspection_endpoint": format!("{issuer}/oauth/introspect"),
            "registration_endpoint": format!("{issuer}/oauth/register"),
            "grant_types_supported": ["authorization_code", "refresh_token"],
            "response_types_supported": ["code"],
            "token_endpoint_auth_methods_supported": ["client_secret_post", "client_secret_basic"],
            "scopes_supported": resources.registry.all_scopes(),
            "response_modes_supported": ["query"],
            "code_challenge_methods_supported": ["S256", "plain"]
        }))
    }

    /// Scope catalog for consent screens and client configuration UIs.
    async fn handle_scope_catalog(
        State(resources): State<Arc<ServerResources>>,
    ) -> impl IntoResponse {
        Json(resources.registry.catalog())
    }

    async fn handle_authorize_query(
        State(resources): State<Arc<ServerResources>>,
        Query(request): Query<AuthorizeRequest>,
    ) -> Result<impl IntoResponse, OAuthError> {
        let response = resources.service.authorize(request).await?;
        Ok(Json(response))
    }

    async fn handle_authorize_json(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<AuthorizeRequest>,
    ) -> Result<impl IntoResponse, OAuthError> {
        let response = resources.service.authorize(request).await?;
        Ok(Json(response))
    }

    async fn handle_token(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Form(request): Form<TokenRequest>,
    ) -> Result<impl IntoResponse, OAuthError> {
        let credentials = resolve_credentials(
            &headers,
            request.client_id.clone(),
            request.client_secret.clone(),
        )?;
        let response = resources.service.token(request, credentials).await?;
        Ok(Json(response))
    }

    /// RFC 7009 §2.2: success regardless of whether the token existed.
    async fn handle_revoke(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Form(request): Form<RevokeRequest>,
    ) -> Result<impl IntoResponse, OAuthError> {
        let credentials =
            resolve_credentials(&headers, request.client_id, request.client_secret)?;
        resources
            .service
            .revoke(&request.token, request.token_type_hint.as_deref(), credentials)
            .await?;
        Ok(StatusCode::OK)
    }

    async fn handle_introspect(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Form(request): Form<IntrospectRequest>,
    ) -> Result<impl IntoResponse, OAuthError> {
        let credentials =
            resolve_credentials(&headers, request.client_id, request.client_secret)?;
        let response = resources
            .service
            .introspect(&request.token, credentials)
            .await?;
        Ok(Json(response))
    }

    /// RFC 7591-style registration. The plaintext secret appears in this
    /// response and nowhere else, ever.
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ClientRegistrationRequest>,
    ) -> Result<impl IntoResponse, OAuthError> {
        let spec = ClientSpec {
            name: request.name,
            redirect_uris: request.redirect_uris,
            allowed_scopes: parse_scope_param(&request.scope),
            description: request.description,
            website: request.website,
        };
        let (client, secret) = resources.clients.create(spec).await?;
        let response = ClientRegistrationResponse {
            client_id: client.client_id,
            client_secret: secret.into_string(),
            name: client.name,
            redirect_uris: client.redirect_uris,
            scope: join_scopes(&client.allowed_scopes),
            client_id_issued_at: client.created_at.timestamp(),
        };
        Ok((StatusCode::CREATED, Json(response)))
    }
}

/// Health routes for load balancer checks
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes() -> Router {
        async fn health_handler() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }

        Router::new().route("/health", get(health_handler))
    }
}

/// Assemble the full application router.
pub fn router(resources: Arc<ServerResources>) -> Router {
    OAuthRoutes::routes(resources)
        .merge(HealthRoutes::routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Resolve client credentials from HTTP Basic or body fields. Basic wins
/// when both are present; supplying neither is an authentication failure,
/// not a malformed request.
fn resolve_credentials(
    headers: &HeaderMap,
    body_client_id: Option<String>,
    body_client_secret: Option<String>,
) -> Result<ClientCredentials, OAuthError> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| OAuthError::InvalidClient)?;
        if let Some(encoded) = value.strip_prefix("Basic ") {
            let decoded = STANDARD
                .decode(encoded.trim())
                .map_err(|_| OAuthError::InvalidClient)?;
            let decoded = String::from_utf8(decoded).map_err(|_| OAuthError::InvalidClient)?;
            let (client_id, client_secret) =
                decoded.split_once(':').ok_or(OAuthError::InvalidClient)?;
            return Ok(ClientCredentials {
                client_id: client_id.to_owned(),
                client_secret: client_secret.to_owned(),
            });
        }
    }
    match (body_client_id, body_client_secret) {
        (Some(client_id), Some(client_secret)) => Ok(ClientCredentials {
            client_id,
            client_secret,
        }),
        _ => {
            tracing::warn!("Request rejected: no client credentials presented");
            Err(OAuthError::InvalidClient)
        }
    }
}
