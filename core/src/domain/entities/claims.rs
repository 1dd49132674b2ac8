//! Claim set carried inside a signed token.
//!
//! Reserved claims are explicit fields serialized under their registered JWT
//! names; every other key lives in the residual `custom` map.

use chrono::Utc;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;

/// Unique token identifier
pub const CLAIM_ID: &str = "jti";
/// Token issuer
pub const CLAIM_ISSUER: &str = "iss";
/// Issue time, epoch seconds
pub const CLAIM_ISSUED_AT: &str = "iat";
/// Expiry time, epoch seconds
pub const CLAIM_EXPIRES_AT: &str = "exp";
/// Audience
pub const CLAIM_AUDIENCE: &str = "aud";
/// Not-before time, epoch seconds
pub const CLAIM_NOT_BEFORE: &str = "nbf";
/// Subject
pub const CLAIM_SUBJECT: &str = "sub";

/// Claim names that callers can never set through a payload
pub const RESERVED_CLAIMS: [&str; 7] = [
    CLAIM_AUDIENCE,
    CLAIM_EXPIRES_AT,
    CLAIM_ID,
    CLAIM_ISSUED_AT,
    CLAIM_ISSUER,
    CLAIM_NOT_BEFORE,
    CLAIM_SUBJECT,
];

/// Caller-supplied custom claims
pub type Payload = HashMap<String, Value>;

/// Returns true if `key` is one of the registered claim names
pub fn is_reserved_claim(key: &str) -> bool {
    RESERVED_CLAIMS.contains(&key)
}

/// Decoded or freshly stamped claim set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique identifier for the token)
    #[serde(rename = "jti")]
    pub id: String,

    /// Issuer
    #[serde(rename = "iss", default)]
    pub issuer: String,

    /// Issued at timestamp
    #[serde(rename = "iat", deserialize_with = "numeric_date")]
    pub issued_at: i64,

    /// Expiration timestamp
    #[serde(rename = "exp", deserialize_with = "numeric_date")]
    pub expires_at: i64,

    /// Audience (string or array, kept verbatim)
    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Value>,

    /// Not before timestamp
    #[serde(
        rename = "nbf",
        default,
        deserialize_with = "optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_before: Option<i64>,

    /// Subject
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Every non-reserved claim
    #[serde(flatten)]
    pub custom: Payload,
}

impl Claims {
    /// Stamps a new claim set.
    ///
    /// Payload entries named like a reserved claim are dropped so the
    /// engine-computed values always win.
    pub fn new(
        id: impl Into<String>,
        issuer: impl Into<String>,
        issued_at: i64,
        expires_at: i64,
        payload: Payload,
    ) -> Self {
        let custom = payload
            .into_iter()
            .filter(|(key, _)| !is_reserved_claim(key))
            .collect();

        Self {
            id: id.into(),
            issuer: issuer.into(),
            issued_at,
            expires_at,
            audience: None,
            not_before: None,
            subject: None,
            custom,
        }
    }

    /// Copies every claim and replaces only the validity window
    pub fn retread(&self, issued_at: i64, expires_at: i64) -> Self {
        Self {
            issued_at,
            expires_at,
            ..self.clone()
        }
    }

    /// Checks whether the claims are expired at the given epoch second
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Checks whether the token may not be used yet at the given epoch second
    pub fn is_premature_at(&self, now: i64) -> bool {
        self.issued_at > now || self.not_before.map_or(false, |nbf| nbf > now)
    }

    /// Looks up any claim by its wire name, reserved or custom
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            CLAIM_ID => Some(Value::from(self.id.clone())),
            CLAIM_ISSUER => Some(Value::from(self.issuer.clone())),
            CLAIM_ISSUED_AT => Some(Value::from(self.issued_at)),
            CLAIM_EXPIRES_AT => Some(Value::from(self.expires_at)),
            CLAIM_AUDIENCE => self.audience.clone(),
            CLAIM_NOT_BEFORE => self.not_before.map(Value::from),
            CLAIM_SUBJECT => self.subject.clone().map(Value::from),
            _ => self.custom.get(key).cloned(),
        }
    }

    /// Custom claims only
    pub fn payload(&self) -> &Payload {
        &self.custom
    }

    /// Consumes the claims, keeping the custom claims only
    pub fn into_payload(self) -> Payload {
        self.custom
    }
}

/// Whole seconds of a NumericDate; fractional values are truncated
fn numeric_date_seconds(number: &Number) -> Option<i64> {
    if let Some(seconds) = number.as_i64() {
        return Some(seconds);
    }
    let seconds = number.as_f64()?.trunc();
    (seconds.is_finite() && seconds >= i64::MIN as f64 && seconds < i64::MAX as f64)
        .then_some(seconds as i64)
}

fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    numeric_date_seconds(&number)
        .ok_or_else(|| D::Error::custom(format!("NumericDate out of range: {}", number)))
}

fn optional_numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Number>::deserialize(deserializer)? {
        Some(number) => numeric_date_seconds(&number)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("NumericDate out of range: {}", number))),
        None => Ok(None),
    }
}
