//! Session adapter trait defining the key-value contract for identity sessions.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::context::CallContext;

/// Failures reported by a session store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The store could not be reached
    #[error("Session store unavailable: {message}")]
    Unavailable { message: String },

    /// The store was reached but the command failed
    #[error("Session store operation failed: {message}")]
    Operation { message: String },
}

impl AdapterError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        AdapterError::Unavailable {
            message: message.into(),
        }
    }

    pub fn operation(message: impl Into<String>) -> Self {
        AdapterError::Operation {
            message: message.into(),
        }
    }
}

/// External key-value store holding the currently valid token id per identity
///
/// Each call must be a single atomic store operation. Implementations may use
/// the context to bound their own I/O; the engine additionally aborts any
/// call whose context is cancelled or past its deadline.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Arguments
    /// * `key` - Session key derived from issuer and identity
    /// * `value` - Current token id
    /// * `ttl` - Lifetime of the record, equal to the token's validity window
    async fn put(
        &self,
        ctx: &CallContext,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), AdapterError>;

    /// Fetch the value stored under `key`
    ///
    /// # Returns
    /// * `Ok(Some(value))` - Record present
    /// * `Ok(None)` - No record, or the record expired
    async fn get(&self, ctx: &CallContext, key: &str) -> Result<Option<String>, AdapterError>;

    /// Remove the record under `key`; removing a missing key succeeds
    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), AdapterError>;
}
