//! Shared configuration and response types for TokenWarden
//!
//! This crate provides common functionality used across all workspace crates:
//! - Configuration types (token engine, session cache, logging)
//! - Error response structures and stable error codes

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    CacheConfig, EngineConfig, Environment, LogFormat, LoggingConfig, TokenConfig,
};
pub use errors::{error_codes, ErrorResponse};
