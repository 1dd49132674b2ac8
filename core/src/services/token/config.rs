//! Configuration for the token service

use std::time::Duration;

use tw_shared::config::TokenConfig;

use crate::domain::entities::{
    DEFAULT_SESSION_GRACE_SECONDS, DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS,
};

/// Configuration for the token service
#[derive(Clone)]
pub struct TokenServiceConfig {
    /// Comma-separated `source:field` token locations
    pub locations: String,
    /// Signing method name (HS256 when empty or unrecognized)
    pub sign_method: String,
    /// HMAC shared secret
    pub secret_key: Option<String>,
    /// RSA/ECDSA public key, PEM text or file path
    pub public_key: Option<String>,
    /// RSA/ECDSA private key, PEM text or file path
    pub private_key: Option<String>,
    /// Claim naming the identity for single-session enforcement
    pub identity_key: Option<String>,
    /// Lifetime applied when callers pass a non-positive ttl, in seconds
    pub default_ttl: i64,
    /// Seconds a session record outlives its token's expiry
    pub session_grace: i64,
    /// Issuer stamped by [`TokenService::issue_default`](super::TokenService::issue_default)
    pub issuer: String,
}

impl std::fmt::Debug for TokenServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenServiceConfig")
            .field("locations", &self.locations)
            .field("sign_method", &self.sign_method)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key.is_some())
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("identity_key", &self.identity_key)
            .field("default_ttl", &self.default_ttl)
            .field("session_grace", &self.session_grace)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            locations: "header:Authorization".to_string(),
            sign_method: "HS256".to_string(),
            secret_key: None,
            public_key: None,
            private_key: None,
            identity_key: None,
            default_ttl: DEFAULT_TOKEN_TTL_SECONDS,
            session_grace: DEFAULT_SESSION_GRACE_SECONDS,
            issuer: "tokenwarden".to_string(),
        }
    }
}

impl TokenServiceConfig {
    /// HMAC configuration with the given secret
    pub fn hmac(sign_method: &str, secret: impl Into<String>) -> Self {
        Self {
            sign_method: sign_method.to_string(),
            secret_key: Some(secret.into()),
            ..Self::default()
        }
    }

    /// RSA/ECDSA configuration from PEM text or file paths
    pub fn key_pair(
        sign_method: &str,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            sign_method: sign_method.to_string(),
            public_key: Some(public_key.into()),
            private_key: Some(private_key.into()),
            ..Self::default()
        }
    }

    pub fn with_locations(mut self, locations: impl Into<String>) -> Self {
        self.locations = locations.into();
        self
    }

    pub fn with_identity_key(mut self, identity_key: impl Into<String>) -> Self {
        self.identity_key = Some(identity_key.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl = seconds;
        self
    }

    pub fn with_session_grace(mut self, seconds: i64) -> Self {
        self.session_grace = seconds;
        self
    }

    /// Identity claim key, ignoring an empty setting
    pub fn identity_key(&self) -> Option<&str> {
        self.identity_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Effective lifetime for a requested ttl, at most [`MAX_TOKEN_TTL_SECONDS`]
    pub fn effective_ttl(&self, requested: i64) -> i64 {
        let ttl = if requested > 0 {
            requested
        } else if self.default_ttl > 0 {
            self.default_ttl
        } else {
            DEFAULT_TOKEN_TTL_SECONDS
        };
        ttl.min(MAX_TOKEN_TTL_SECONDS)
    }

    /// Lifetime of the session record for a token living `ttl` seconds
    pub fn session_ttl(&self, ttl: i64) -> Duration {
        let seconds = ttl.max(0).saturating_add(self.session_grace.max(0));
        Duration::from_secs(u64::try_from(seconds).unwrap_or(0))
    }
}

impl From<&TokenConfig> for TokenServiceConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            locations: config.locations.clone(),
            sign_method: config.sign_method.clone(),
            secret_key: non_empty(&config.secret_key),
            public_key: non_empty(&config.public_key),
            private_key: non_empty(&config.private_key),
            identity_key: config.identity_key().map(str::to_string),
            default_ttl: config.default_ttl,
            session_grace: config.session_grace,
            issuer: config.issuer.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
