// ABOUTME: Integration tests for token revocation and introspection
// ABOUTME: Covers idempotence, hint handling, confidentiality, and expiry
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{credentials, TestHarness};
use vendia_oauth_server::{config::TokenTtls, errors::OAuthError, service::ClientCredentials};

#[tokio::test]
async fn test_revoke_access_token() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    harness
        .resources
        .service
        .revoke(&tokens.access_token, None, credentials(&client, &secret))
        .await
        .unwrap();

    let validated = harness
        .resources
        .service
        .validate_token(&tokens.access_token)
        .await
        .unwrap();
    assert!(validated.is_none());

    // The paired refresh token is untouched.
    assert!(harness
        .refresh(&client, &secret, &tokens.refresh_token, None)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_revoke_refresh_token_with_hint() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    harness
        .resources
        .service
        .revoke(
            &tokens.refresh_token,
            Some("refresh_token"),
            credentials(&client, &secret),
        )
        .await
        .unwrap();

    let err = harness
        .refresh(&client, &secret, &tokens.refresh_token, None)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_wrong_hint_still_revokes() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    harness
        .resources
        .service
        .revoke(
            &tokens.refresh_token,
            Some("access_token"),
            credentials(&client, &secret),
        )
        .await
        .unwrap();

    assert!(harness
        .refresh(&client, &secret, &tokens.refresh_token, None)
        .await
        .is_err());
}

#[tokio::test]
async fn test_revoke_is_idempotent_and_silent() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    for _ in 0..2 {
        harness
            .resources
            .service
            .revoke(&tokens.access_token, None, credentials(&client, &secret))
            .await
            .unwrap();
    }
    // Unknown values succeed identically.
    harness
        .resources
        .service
        .revoke("no-such-token", None, credentials(&client, &secret))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_revoking_other_clients_token_is_a_silent_noop() {
    let harness = TestHarness::new();
    let (owner, owner_secret) = harness.register_client(&["orders.read"]).await;
    let (other, other_secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&owner, &owner_secret).await;

    harness
        .resources
        .service
        .revoke(&tokens.access_token, None, credentials(&other, &other_secret))
        .await
        .unwrap();

    // Still live for the owner.
    assert!(harness
        .resources
        .service
        .validate_token(&tokens.access_token)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_revoke_requires_client_authentication() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    let err = harness
        .resources
        .service
        .revoke(
            &tokens.access_token,
            None,
            ClientCredentials {
                client_id: client.client_id.clone(),
                client_secret: "wrong".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::InvalidClient);
}

#[tokio::test]
async fn test_introspect_active_access_token() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read", "customers.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    let body = harness
        .resources
        .service
        .introspect(&tokens.access_token, credentials(&client, &secret))
        .await
        .unwrap();

    assert!(body.active);
    assert_eq!(body.scope.as_deref(), Some("customers.read orders.read"));
    assert_eq!(body.client_id.as_deref(), Some(client.client_id.as_str()));
    assert_eq!(body.token_type.as_deref(), Some("Bearer"));
    let (exp, iat) = (body.exp.unwrap(), body.iat.unwrap());
    assert_eq!(exp - iat, 3600);
}

#[tokio::test]
async fn test_introspect_refresh_token() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    let body = harness
        .resources
        .service
        .introspect(&tokens.refresh_token, credentials(&client, &secret))
        .await
        .unwrap();
    assert!(body.active);
}

#[tokio::test]
async fn test_introspect_unknown_token_is_bare_inactive() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;

    let body = harness
        .resources
        .service
        .introspect("no-such-token", credentials(&client, &secret))
        .await
        .unwrap();

    assert!(!body.active);
    assert!(body.scope.is_none());
    assert!(body.client_id.is_none());
    assert!(body.exp.is_none());
}

#[tokio::test]
async fn test_introspect_revoked_token_is_inactive() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    harness
        .resources
        .service
        .revoke(&tokens.access_token, None, credentials(&client, &secret))
        .await
        .unwrap();

    let body = harness
        .resources
        .service
        .introspect(&tokens.access_token, credentials(&client, &secret))
        .await
        .unwrap();
    assert!(!body.active);
}

#[tokio::test]
async fn test_introspect_expired_token_is_inactive() {
    let harness = TestHarness::with_ttls(TokenTtls {
        access_token_secs: -1,
        ..TokenTtls::default()
    });
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    let body = harness
        .resources
        .service
        .introspect(&tokens.access_token, credentials(&client, &secret))
        .await
        .unwrap();
    assert!(!body.active);
}

#[tokio::test]
async fn test_introspect_other_clients_token_reveals_nothing() {
    let harness = TestHarness::new();
    let (owner, owner_secret) = harness.register_client(&["orders.read"]).await;
    let (other, other_secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&owner, &owner_secret).await;

    let body = harness
        .resources
        .service
        .introspect(&tokens.access_token, credentials(&other, &other_secret))
        .await
        .unwrap();

    // Indistinguishable from a token that never existed.
    assert!(!body.active);
    assert!(body.scope.is_none());
    assert!(body.client_id.is_none());
}

#[tokio::test]
async fn test_introspect_requires_client_authentication() {
    let harness = TestHarness::new();
    let (client, secret) = harness.register_client(&["orders.read"]).await;
    let tokens = harness.obtain_tokens(&client, &secret).await;

    let err = harness
        .resources
        .service
        .introspect(
            &tokens.access_token,
            ClientCredentials {
                client_id: client.client_id.clone(),
                client_secret: "wrong".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, OAuthError::InvalidClient);
}
