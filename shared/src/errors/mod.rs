//! Shared error response structure and stable error codes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error body handed to transport layers (HTTP handlers, RPC interceptors)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for client identification
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Whether retrying the identical call may succeed
    #[serde(default)]
    pub retryable: bool,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,

    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            retryable: false,
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Mark the response as retryable
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Add a detail field to the error response
    pub fn add_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let details = self.details.get_or_insert_with(HashMap::new);
        if let Ok(json_value) = serde_json::to_value(value) {
            details.insert(key.into(), json_value);
        }
        self
    }
}

/// Error codes used by the token engine, one per error kind
pub mod error_codes {
    pub const MISSING_TOKEN: &str = "MISSING_TOKEN";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const EXPIRED_TOKEN: &str = "EXPIRED_TOKEN";
    pub const SIGNING_METHOD_MISMATCH: &str = "SIGNING_METHOD_MISMATCH";
    pub const MISSING_IDENTITY: &str = "MISSING_IDENTITY";
    pub const AUTHENTICATED_ELSEWHERE: &str = "AUTHENTICATED_ELSEWHERE";
    pub const INVALID_SIGNING_METHOD: &str = "INVALID_SIGNING_METHOD";
    pub const INVALID_SECRET_KEY: &str = "INVALID_SECRET_KEY";
    pub const INVALID_PUBLIC_KEY: &str = "INVALID_PUBLIC_KEY";
    pub const INVALID_PRIVATE_KEY: &str = "INVALID_PRIVATE_KEY";
    pub const TOKEN_GENERATION_FAILED: &str = "TOKEN_GENERATION_FAILED";
    pub const SESSION_STORE_ERROR: &str = "SESSION_STORE_ERROR";
    pub const CANCELLED: &str = "CANCELLED";
    pub const DEADLINE_EXCEEDED: &str = "DEADLINE_EXCEEDED";
}
