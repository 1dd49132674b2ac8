//! Configuration module with engine-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `token` - Signing method, key material, token seek locations and identity key
//! - `cache` - Redis configuration for identity session bookkeeping
//! - `environment` - Environment detection and logging configuration

pub mod cache;
pub mod environment;
pub mod token;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use token::TokenConfig;

/// Complete engine configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Environment the engine runs in
    #[serde(default)]
    pub environment: Environment,

    /// Token signing and extraction configuration
    pub token: TokenConfig,

    /// Session cache configuration (used only when an identity key is set)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        let mut logging = LoggingConfig::for_environment(environment);
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            logging.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            logging.format = format;
        }

        Self {
            environment,
            token: TokenConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging,
        }
    }

    /// Whether identity session enforcement (and therefore the cache) is needed
    pub fn requires_session_store(&self) -> bool {
        self.token.identity_key().is_some()
    }
}
