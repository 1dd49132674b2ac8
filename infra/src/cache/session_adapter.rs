//! Redis-backed session adapter
//!
//! Stores one record per identity under
//! `[{prefix}:]jwt:{issuer}:identity:{identity}` with the token id as value
//! and the token's validity window as TTL.

use async_trait::async_trait;
use redis::RedisError;
use std::time::Duration;
use tracing::debug;

use tw_core::{AdapterError, CallContext, SessionAdapter};

use super::redis_client::{is_unavailable_error, RedisClient};

/// Session adapter storing identity sessions in Redis
#[derive(Debug, Clone)]
pub struct RedisSessionAdapter {
    client: RedisClient,
}

impl RedisSessionAdapter {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn key(&self, key: &str) -> String {
        self.client.config().make_key(key)
    }
}

#[async_trait]
impl SessionAdapter for RedisSessionAdapter {
    async fn put(
        &self,
        _ctx: &CallContext,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), AdapterError> {
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        self.client
            .set_with_expiry(&self.key(key), value, seconds)
            .await
            .map_err(to_adapter_error)
    }

    async fn get(&self, _ctx: &CallContext, key: &str) -> Result<Option<String>, AdapterError> {
        self.client
            .get(&self.key(key))
            .await
            .map_err(to_adapter_error)
    }

    async fn delete(&self, _ctx: &CallContext, key: &str) -> Result<(), AdapterError> {
        let deleted = self
            .client
            .delete(&self.key(key))
            .await
            .map_err(to_adapter_error)?;
        if !deleted {
            debug!("Session key '{}' was already absent", key);
        }
        Ok(())
    }
}

pub(crate) fn to_adapter_error(error: RedisError) -> AdapterError {
    if is_unavailable_error(&error) {
        AdapterError::unavailable(error.to_string())
    } else {
        AdapterError::operation(error.to_string())
    }
}
