//! # Infrastructure Layer
//!
//! This crate wires the TokenWarden engine to its environment:
//! - **Cache**: Redis client and the Redis-backed session adapter
//! - **Telemetry**: tracing subscriber configured from [`LoggingConfig`](tw_shared::LoggingConfig)
//! - **Bootstrap**: configuration loading and token service construction

use std::sync::Arc;

use tw_core::{TokenError, TokenService, TokenServiceConfig};
use tw_shared::config::EngineConfig;

/// Cache module - Redis client and session adapter
pub mod cache;

/// Telemetry module - tracing subscriber setup
pub mod telemetry;

pub use cache::{RedisClient, RedisSessionAdapter};
pub use telemetry::init_tracing;

/// Load engine configuration from the environment, reading `.env` if present
pub fn load_config() -> EngineConfig {
    dotenvy::dotenv().ok();
    EngineConfig::from_env()
}

/// Build the token service for `config`
///
/// A Redis session adapter is connected and attached only when an identity
/// key is configured.
pub async fn initialize(config: &EngineConfig) -> Result<TokenService, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing token engine...");

    let service = TokenService::new(TokenServiceConfig::from(&config.token))?;

    if !config.requires_session_store() {
        tracing::info!(
            sign_method = %service.sign_method(),
            "Token engine initialized without session enforcement"
        );
        return Ok(service);
    }

    let client = RedisClient::new(config.cache.clone()).await?;
    let service = service.with_adapter(Arc::new(RedisSessionAdapter::new(client)));

    tracing::info!(
        sign_method = %service.sign_method(),
        "Token engine initialized with Redis session enforcement"
    );
    Ok(service)
}

/// Load configuration, install tracing and build the token service
pub async fn bootstrap() -> Result<TokenService, InfrastructureError> {
    let config = load_config();
    init_tracing(&config.logging)?;
    initialize(&config).await
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis did not accept a connection in time
    #[error("Connection timed out after {0}s")]
    ConnectionTimeout(u64),

    /// Token engine could not be built from the configuration
    #[error("Token engine error: {0}")]
    Token(#[from] TokenError),
}
