//! Single-active-session enforcement per (issuer, identity)

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::context::CallContext;
use crate::errors::{TokenError, TokenResult};
use crate::repositories::session::SessionAdapter;

/// Builds the session store key for an identity
pub fn session_key(issuer: &str, identity: &str) -> String {
    format!("jwt:{}:identity:{}", issuer, identity)
}

/// Renders an identity claim as the string used in session keys
pub fn identity_to_string(identity: &Value) -> String {
    match identity {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Guards identity sessions through an optional external adapter
///
/// Without an adapter every operation succeeds without side effects.
#[derive(Clone, Default)]
pub struct IdentitySessionGuard {
    adapter: Option<Arc<dyn SessionAdapter>>,
}

impl std::fmt::Debug for IdentitySessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySessionGuard")
            .field("active", &self.is_active())
            .finish()
    }
}

impl IdentitySessionGuard {
    pub fn new(adapter: Option<Arc<dyn SessionAdapter>>) -> Self {
        Self { adapter }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.adapter.is_some()
    }

    /// Marks `token_id` as the only valid token for the identity
    pub async fn record_session(
        &self,
        ctx: &CallContext,
        issuer: &str,
        identity: &str,
        token_id: &str,
        ttl: Duration,
    ) -> TokenResult<()> {
        let Some(adapter) = &self.adapter else {
            return Ok(());
        };

        let key = session_key(issuer, identity);
        ctx.run(adapter.put(ctx, &key, token_id, ttl)).await??;
        tracing::debug!(
            session_key = %key,
            token_id = %token_id,
            ttl_secs = ttl.as_secs(),
            "Session recorded"
        );
        Ok(())
    }

    /// Checks that `token_id` is the identity's current token
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Ids match, or no record exists and `ignore_missing` is set
    /// * `Err(TokenError::InvalidToken)` - No record and `ignore_missing` is unset
    /// * `Err(TokenError::AuthenticatedElsewhere)` - A newer token replaced this one
    pub async fn check_session(
        &self,
        ctx: &CallContext,
        issuer: &str,
        identity: &str,
        token_id: &str,
        ignore_missing: bool,
    ) -> TokenResult<()> {
        let Some(adapter) = &self.adapter else {
            return Ok(());
        };

        let key = session_key(issuer, identity);
        let current = ctx
            .run(adapter.get(ctx, &key))
            .await??
            .filter(|value| !value.is_empty());

        match current {
            None if ignore_missing => Ok(()),
            None => {
                tracing::debug!(session_key = %key, "No session recorded for token");
                Err(TokenError::invalid_token("session not found"))
            }
            Some(current) if current != token_id => {
                tracing::debug!(
                    session_key = %key,
                    token_id = %token_id,
                    "Token superseded by a newer session"
                );
                Err(TokenError::AuthenticatedElsewhere)
            }
            Some(_) => Ok(()),
        }
    }

    /// Removes the identity's session record
    pub async fn clear_session(
        &self,
        ctx: &CallContext,
        issuer: &str,
        identity: &str,
    ) -> TokenResult<()> {
        let Some(adapter) = &self.adapter else {
            return Ok(());
        };

        let key = session_key(issuer, identity);
        ctx.run(adapter.delete(ctx, &key)).await??;
        tracing::debug!(session_key = %key, "Session cleared");
        Ok(())
    }
}
