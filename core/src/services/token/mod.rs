//! Token engine services
//!
//! - Signing key loading and validation for HMAC, RSA and ECDSA (P-256, P-384, P-521)
//! - Compact JWS encoding and decoding
//! - Token extraction from request headers, query, cookies and forms
//! - Single-active-session enforcement through a session adapter
//! - The lifecycle service combining all of the above

mod codec;
mod config;
mod key_manager;
mod locator;
mod service;
mod session_guard;

#[cfg(test)]
mod tests;

pub use codec::TokenCodec;
pub use config::TokenServiceConfig;
pub use key_manager::{
    EcdsaKeys, KeyMaterial, KeyOrigin, SignFamily, SignMethod, SigningKeyManager,
};
pub use locator::{RequestContext, RequestParts, TokenLocator};
pub use service::TokenService;
pub use session_guard::{identity_to_string, session_key, IdentitySessionGuard};
