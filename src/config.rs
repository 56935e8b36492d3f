// ABOUTME: Environment-driven server configuration with typed token lifetimes
// ABOUTME: Invalid values fall back to defaults with a logged warning
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::Duration;
use std::env;
use tracing::warn;

/// Lifetimes for the three credential kinds the server mints.
///
/// Stored as plain integers so the struct stays `Copy` and trivially
/// serializable; the accessor methods hand out `chrono::Duration` for
/// arithmetic against `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    /// Authorization code lifetime in seconds. Codes are meant to be
    /// exchanged immediately; ten minutes is already generous.
    pub auth_code_secs: i64,
    /// Access token lifetime in seconds.
    pub access_token_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_secs: i64,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            auth_code_secs: 600,
            access_token_secs: 3600,
            refresh_token_secs: 30 * 24 * 3600,
        }
    }
}

impl TokenTtls {
    #[must_use]
    pub fn auth_code(&self) -> Duration {
        Duration::seconds(self.auth_code_secs)
    }

    #[must_use]
    pub fn access_token(&self) -> Duration {
        Duration::seconds(self.access_token_secs)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Duration {
        Duration::seconds(self.refresh_token_secs)
    }
}

/// Runtime configuration for the authorization server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP listener binds.
    pub http_port: u16,
    /// Issuer URL advertised in discovery metadata. No trailing slash.
    pub issuer_url: String,
    /// Token lifetimes.
    pub ttls: TokenTtls,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            issuer_url: "http://localhost:8080".into(),
            ttls: TokenTtls::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults (and warning) on anything missing or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let http_port = env_parse("HTTP_PORT", defaults.http_port);
        let issuer_url = env::var("ISSUER_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .unwrap_or_else(|_| format!("http://localhost:{http_port}"));
        let ttls = TokenTtls {
            auth_code_secs: env_parse("AUTH_CODE_TTL_SECS", defaults.ttls.auth_code_secs),
            access_token_secs: env_parse("ACCESS_TOKEN_TTL_SECS", defaults.ttls.access_token_secs),
            refresh_token_secs: env_parse(
                "REFRESH_TOKEN_TTL_SECS",
                defaults.ttls.refresh_token_secs,
            ),
        };
        Self {
            http_port,
            issuer_url,
            ttls,
        }
    }

    /// One-line startup summary for the logs. Contains no secrets.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} issuer={} code_ttl={}s access_ttl={}s refresh_ttl={}s",
            self.http_port,
            self.issuer_url,
            self.ttls.auth_code_secs,
            self.ttls.access_token_secs,
            self.ttls.refresh_token_secs
        )
    }
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {key}={raw}, using default");
            default
        }),
        Err(_) => default,
    }
}
