//! Issued token handed back to callers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Token lifetime used when callers pass a non-positive ttl (1 hour)
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Longest accepted token lifetime (100 years); larger requests are clamped
pub const MAX_TOKEN_TTL_SECONDS: i64 = 100 * 365 * 24 * 3600;

/// How long a session record outlives its token, so expired tokens can still
/// be refreshed or verified with `ignore_expired` (7 days)
pub const DEFAULT_SESSION_GRACE_SECONDS: i64 = 7 * 24 * 3600;

/// Compact signed token plus out-of-band timing metadata
///
/// The engine keeps no copy of issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Compact JWS representation
    pub token: String,

    /// When the token stops verifying
    pub expires_at: DateTime<Utc>,

    /// Half-way point of the validity window; refresh after this
    pub refresh_at: DateTime<Utc>,
}

impl Token {
    /// Creates a token from its compact form and validity window (epoch seconds)
    pub fn new(token: impl Into<String>, issued_at: i64, expires_at: i64) -> Self {
        let refresh_at = issued_at.saturating_add(expires_at.saturating_sub(issued_at) / 2);

        Self {
            token: token.into(),
            expires_at: from_timestamp(expires_at),
            refresh_at: from_timestamp(refresh_at),
        }
    }

    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Checks if the token is past its refresh point
    pub fn should_refresh(&self) -> bool {
        Utc::now() >= self.refresh_at
    }

    /// Seconds until expiry, zero once expired
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

fn from_timestamp(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}
