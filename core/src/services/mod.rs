//! Token engine services.

pub mod token;

// Re-export commonly used types
pub use token::{
    RequestContext, RequestParts, SignMethod, SigningKeyManager, TokenCodec, TokenLocator,
    TokenService, TokenServiceConfig,
};
