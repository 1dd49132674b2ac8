//! # TokenWarden Core
//!
//! Token issuance, verification and session-revocation engine.
//! This crate contains the claim and token entities, the session adapter
//! contract, error types, and the services that sign, locate, verify,
//! retread and destroy tokens.

pub mod context;
pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use context::CallContext;
pub use domain::{Claims, Payload, SeekLocation, SeekSource, Token};
pub use errors::{ErrorKind, TokenError, TokenResult};
pub use repositories::{AdapterError, MemorySessionAdapter, SessionAdapter};
pub use services::{
    RequestContext, RequestParts, SignMethod, SigningKeyManager, TokenCodec, TokenLocator,
    TokenService, TokenServiceConfig,
};
