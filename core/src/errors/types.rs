//! Token engine error definitions
//!
//! Every failure maps to exactly one [`ErrorKind`] and a stable machine-readable
//! code, so transport layers can pick status codes without parsing messages.

use crate::repositories::session::AdapterError;
use thiserror::Error;
use tw_shared::errors::{error_codes, ErrorResponse};

/// Coarse error category, one per failure mode callers distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    SigningMethodMismatch,
    MissingIdentity,
    AuthenticatedElsewhere,
    InvalidSigningMethod,
    InvalidSecretKey,
    InvalidPublicKey,
    InvalidPrivateKey,
    TokenGenerationFailed,
    SessionStore,
    Cancelled,
    DeadlineExceeded,
}

impl ErrorKind {
    /// Stable upper-snake code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingToken => error_codes::MISSING_TOKEN,
            ErrorKind::InvalidToken => error_codes::INVALID_TOKEN,
            ErrorKind::ExpiredToken => error_codes::EXPIRED_TOKEN,
            ErrorKind::SigningMethodMismatch => error_codes::SIGNING_METHOD_MISMATCH,
            ErrorKind::MissingIdentity => error_codes::MISSING_IDENTITY,
            ErrorKind::AuthenticatedElsewhere => error_codes::AUTHENTICATED_ELSEWHERE,
            ErrorKind::InvalidSigningMethod => error_codes::INVALID_SIGNING_METHOD,
            ErrorKind::InvalidSecretKey => error_codes::INVALID_SECRET_KEY,
            ErrorKind::InvalidPublicKey => error_codes::INVALID_PUBLIC_KEY,
            ErrorKind::InvalidPrivateKey => error_codes::INVALID_PRIVATE_KEY,
            ErrorKind::TokenGenerationFailed => error_codes::TOKEN_GENERATION_FAILED,
            ErrorKind::SessionStore => error_codes::SESSION_STORE_ERROR,
            ErrorKind::Cancelled => error_codes::CANCELLED,
            ErrorKind::DeadlineExceeded => error_codes::DEADLINE_EXCEEDED,
        }
    }
}

/// Token lifecycle errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("No token found in request")]
    MissingToken,

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Token expired")]
    ExpiredToken,

    #[error("Signing method mismatch: expected {expected}, found {found}")]
    SigningMethodMismatch { expected: String, found: String },

    #[error("Missing identity claim: {key}")]
    MissingIdentity { key: String },

    #[error("Identity authenticated elsewhere")]
    AuthenticatedElsewhere,

    #[error("Invalid signing method: {method}")]
    InvalidSigningMethod { method: String },

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Invalid public key: {message}")]
    InvalidPublicKey { message: String },

    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    #[error("Token generation failed: {message}")]
    TokenGenerationFailed { message: String },

    #[error("Session store error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl TokenError {
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        TokenError::InvalidToken {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::MissingToken => ErrorKind::MissingToken,
            TokenError::InvalidToken { .. } => ErrorKind::InvalidToken,
            TokenError::ExpiredToken => ErrorKind::ExpiredToken,
            TokenError::SigningMethodMismatch { .. } => ErrorKind::SigningMethodMismatch,
            TokenError::MissingIdentity { .. } => ErrorKind::MissingIdentity,
            TokenError::AuthenticatedElsewhere => ErrorKind::AuthenticatedElsewhere,
            TokenError::InvalidSigningMethod { .. } => ErrorKind::InvalidSigningMethod,
            TokenError::InvalidSecretKey => ErrorKind::InvalidSecretKey,
            TokenError::InvalidPublicKey { .. } => ErrorKind::InvalidPublicKey,
            TokenError::InvalidPrivateKey { .. } => ErrorKind::InvalidPrivateKey,
            TokenError::TokenGenerationFailed { .. } => ErrorKind::TokenGenerationFailed,
            TokenError::Adapter(_) => ErrorKind::SessionStore,
            TokenError::Cancelled => ErrorKind::Cancelled,
            TokenError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Only session store failures and call-context interruptions may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SessionStore | ErrorKind::Cancelled | ErrorKind::DeadlineExceeded
        )
    }

    /// Startup errors that prevent the engine from being built
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidSigningMethod
                | ErrorKind::InvalidSecretKey
                | ErrorKind::InvalidPublicKey
                | ErrorKind::InvalidPrivateKey
        )
    }
}

impl From<&TokenError> for ErrorResponse {
    fn from(error: &TokenError) -> Self {
        let response = ErrorResponse::new(error.code(), error.to_string())
            .retryable(error.is_retryable());

        match error {
            TokenError::SigningMethodMismatch { expected, found } => response
                .add_detail("expected", expected)
                .add_detail("found", found),
            TokenError::MissingIdentity { key } => response.add_detail("identity_key", key),
            _ => response,
        }
    }
}

impl From<TokenError> for ErrorResponse {
    fn from(error: TokenError) -> Self {
        ErrorResponse::from(&error)
    }
}

pub type TokenResult<T> = Result<T, TokenError>;
