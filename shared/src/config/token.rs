//! Token engine configuration

use serde::{Deserialize, Serialize};

/// Token signing, extraction and identity configuration
///
/// Key fields are kept as raw strings; the core crate resolves them into key
/// material (literal PEM or file path) once at startup.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Comma-separated `source:field` seek locations, evaluated in order.
    /// Sources: `header`, `query`, `cookie`, `form`.
    #[serde(default = "default_locations")]
    pub locations: String,

    /// Signing method (HS256, HS384, HS512, RS256, RS384, RS512, ES256, ES384, ES512)
    #[serde(default = "default_sign_method")]
    pub sign_method: String,

    /// HMAC shared secret, required for the HS* methods
    #[serde(default)]
    pub secret_key: String,

    /// RSA/ECDSA public key: PEM content or path to a PEM file
    #[serde(default)]
    pub public_key: String,

    /// RSA/ECDSA private key: PEM content or path to a PEM file
    #[serde(default)]
    pub private_key: String,

    /// Claim name carrying the identity; enables single-active-session enforcement
    #[serde(default)]
    pub identity_key: Option<String>,

    /// Token lifetime in seconds used when a caller passes a non-positive ttl
    #[serde(default = "default_ttl")]
    pub default_ttl: i64,

    /// Seconds a session record outlives its token, so expired tokens can
    /// still be refreshed. Zero ties the record to the token lifetime.
    #[serde(default = "default_session_grace")]
    pub session_grace: i64,

    /// Default issuer for callers that don't supply one
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            sign_method: default_sign_method(),
            secret_key: String::new(),
            public_key: String::new(),
            private_key: String::new(),
            identity_key: None,
            default_ttl: default_ttl(),
            session_grace: default_session_grace(),
            issuer: default_issuer(),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("locations", &self.locations)
            .field("sign_method", &self.sign_method)
            .field("secret_key", &redacted(&self.secret_key))
            .field("public_key", &redacted(&self.public_key))
            .field("private_key", &redacted(&self.private_key))
            .field("identity_key", &self.identity_key)
            .field("default_ttl", &self.default_ttl)
            .field("session_grace", &self.session_grace)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenConfig {
    /// Create an HMAC configuration with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret_key: secret.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let default_ttl = std::env::var("JWT_DEFAULT_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let session_grace = std::env::var("JWT_SESSION_GRACE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_session_grace);

        Self {
            locations: std::env::var("JWT_LOCATIONS").unwrap_or_else(|_| default_locations()),
            sign_method: std::env::var("JWT_SIGN_METHOD")
                .unwrap_or_else(|_| default_sign_method()),
            secret_key: std::env::var("JWT_SECRET_KEY").unwrap_or_default(),
            public_key: std::env::var("JWT_PUBLIC_KEY").unwrap_or_default(),
            private_key: std::env::var("JWT_PRIVATE_KEY").unwrap_or_default(),
            identity_key: std::env::var("JWT_IDENTITY_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            default_ttl,
            session_grace,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| default_issuer()),
        }
    }

    /// Set the seek locations
    pub fn with_locations(mut self, locations: impl Into<String>) -> Self {
        self.locations = locations.into();
        self
    }

    /// Set the signing method
    pub fn with_sign_method(mut self, method: impl Into<String>) -> Self {
        self.sign_method = method.into();
        self
    }

    /// Set the asymmetric key pair sources
    pub fn with_key_pair(
        mut self,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        self.public_key = public_key.into();
        self.private_key = private_key.into();
        self
    }

    /// Enable identity session enforcement on the given claim
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = Some(key.into());
        self
    }

    /// Set the default token lifetime in seconds
    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl = seconds;
        self
    }

    /// Set how long session records outlive their tokens
    pub fn with_session_grace(mut self, seconds: i64) -> Self {
        self.session_grace = seconds;
        self
    }

    /// Identity claim key, if enforcement is configured
    pub fn identity_key(&self) -> Option<&str> {
        self.identity_key.as_deref().filter(|k| !k.is_empty())
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

fn default_locations() -> String {
    String::from("header:Authorization")
}

fn default_sign_method() -> String {
    String::from("HS256")
}

fn default_ttl() -> i64 {
    3600 // 1 hour
}

fn default_session_grace() -> i64 {
    7 * 24 * 3600
}

fn default_issuer() -> String {
    String::from("tokenwarden")
}
