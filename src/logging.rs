// ABOUTME: Structured logging setup with env-driven level and format selection
// ABOUTME: Pretty output for development, JSON or compact for deployed environments
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive (RUST_LOG syntax)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Build configuration from `RUST_LOG` and `LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };
        Self { level, format }
    }

    /// Install the global tracing subscriber.
    ///
    /// # Errors
    /// Fails when a subscriber is already installed or the filter directive
    /// cannot be parsed.
    pub fn init(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.level)?;
        let registry = tracing_subscriber::registry().with(filter);
        match self.format {
            LogFormat::Json => registry
                .with(fmt::layer().with_target(true).json())
                .try_init()?,
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_target(false))
                .try_init()?,
            LogFormat::Pretty => registry
                .with(fmt::layer().with_target(true))
                .try_init()?,
        }
        Ok(())
    }
}

/// Convenience entry point used by the server binary.
///
/// # Errors
/// See [`LoggingConfig::init`].
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}
