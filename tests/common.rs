// ABOUTME: Shared test utilities for integration tests
// ABOUTME: Builds an in-memory server harness and registers fixture clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

//! Shared test setup for `vendia_oauth_server` integration tests.

use std::sync::{Arc, Once};
use vendia_oauth_server::{
    clients::{ClientManager, ClientSpec},
    config::{ServerConfig, TokenTtls},
    crypto::SecretFactory,
    errors::OAuthError,
    models::{AuthorizeRequest, AuthorizeResponse, Client, TokenRequest, TokenResponse},
    routes::ServerResources,
    scopes::ScopeRegistry,
    service::{AuthorizationService, ClientCredentials},
    store::{MemoryStore, OAuthStore},
};

pub const REDIRECT_URI: &str = "https://client.example.com/callback";
pub const TENANT: &str = "tenant-1";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// Full server wiring over a shared in-memory store. The store handle is
/// exposed so tests can stage records directly.
pub struct TestHarness {
    pub store: Arc<dyn OAuthStore>,
    pub resources: Arc<ServerResources>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_ttls(TokenTtls::default())
    }

    /// Harness with custom token lifetimes; negative values mint
    /// already-expired records.
    pub fn with_ttls(ttls: TokenTtls) -> Self {
        init_test_logging();
        let store: Arc<dyn OAuthStore> = Arc::new(MemoryStore::new());
        let secrets = Arc::new(SecretFactory::system());
        let registry = Arc::new(ScopeRegistry::commerce());
        let clients = Arc::new(ClientManager::new(
            Arc::clone(&store),
            Arc::clone(&secrets),
            Arc::clone(&registry),
        ));
        let service = AuthorizationService::new(
            Arc::clone(&store),
            Arc::clone(&clients),
            Arc::clone(&registry),
            secrets,
            ttls,
        );
        let resources = Arc::new(ServerResources {
            service,
            clients,
            registry,
            config: ServerConfig::default(),
        });
        Self { store, resources }
    }

    /// Register a client allowed the given scopes. Returns the record and
    /// the plaintext secret.
    pub async fn register_client(&self, scopes: &[&str]) -> (Client, String) {
        let spec = ClientSpec {
            name: "Acme Storefront".into(),
            redirect_uris: vec![REDIRECT_URI.into()],
            allowed_scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
            description: Some("Storefront integration".into()),
            website: Some("https://acme.example.com".into()),
        };
        let (client, secret) = self.resources.clients.create(spec).await.unwrap();
        (client, secret.into_string())
    }

    /// Run the authorize step for a client, optionally narrowing scope.
    pub async fn authorize(&self, client: &Client, scope: Option<&str>) -> AuthorizeResponse {
        self.resources
            .service
            .authorize(authorize_request(&client.client_id, scope))
            .await
            .unwrap()
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(
        &self,
        client: &Client,
        secret: &str,
        code: &str,
    ) -> Result<TokenResponse, OAuthError> {
        self.resources
            .service
            .token(
                code_exchange_request(code, None),
                credentials(client, secret),
            )
            .await
    }

    /// Refresh a token pair, optionally requesting a narrowed scope.
    pub async fn refresh(
        &self,
        client: &Client,
        secret: &str,
        refresh_token: &str,
        scope: Option<&str>,
    ) -> Result<TokenResponse, OAuthError> {
        let request = TokenRequest {
            grant_type: "refresh_token".into(),
            code: None,
            redirect_uri: None,
            client_id: None,
            client_secret: None,
            refresh_token: Some(refresh_token.to_owned()),
            scope: scope.map(str::to_owned),
            code_verifier: None,
        };
        self.resources
            .service
            .token(request, credentials(client, secret))
            .await
    }

    /// Full happy-path flow: authorize then exchange.
    pub async fn obtain_tokens(&self, client: &Client, secret: &str) -> TokenResponse {
        let authorized = self.authorize(client, None).await;
        self.exchange_code(client, secret, &authorized.code)
            .await
            .unwrap()
    }
}

pub fn authorize_request(client_id: &str, scope: Option<&str>) -> AuthorizeRequest {
    AuthorizeRequest {
        client_id: client_id.to_owned(),
        redirect_uri: REDIRECT_URI.into(),
        scope: scope.map(str::to_owned),
        tenant_id: TENANT.into(),
        state: None,
        code_challenge: None,
        code_challenge_method: None,
    }
}

pub fn code_exchange_request(code: &str, verifier: Option<&str>) -> TokenRequest {
    TokenRequest {
        grant_type: "authorization_code".into(),
        code: Some(code.to_owned()),
        redirect_uri: Some(REDIRECT_URI.into()),
        client_id: None,
        client_secret: None,
        refresh_token: None,
        scope: None,
        code_verifier: verifier.map(str::to_owned),
    }
}

pub fn credentials(client: &Client, secret: &str) -> ClientCredentials {
    ClientCredentials {
        client_id: client.client_id.clone(),
        client_secret: secret.to_owned(),
    }
}
