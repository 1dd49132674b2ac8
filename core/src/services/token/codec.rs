//! Compact JWS encoding and validating decoding of claim sets

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::entities::{Claims, CLAIM_EXPIRES_AT, CLAIM_ID, CLAIM_ISSUED_AT};
use crate::errors::{TokenError, TokenResult};

use super::key_manager::SigningKeyManager;

const TOKEN_TYPE: &str = "JWT";

/// JOSE header as written by the codec
#[derive(Debug, Serialize, Deserialize)]
struct JoseHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    alg: String,
}

/// Stateless codec over one immutable signing configuration
///
/// The compact form is assembled here; signing and signature checks are
/// delegated to [`SigningKeyManager`].
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: SigningKeyManager,
}

impl TokenCodec {
    pub fn new(keys: SigningKeyManager) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &SigningKeyManager {
        &self.keys
    }

    /// Signs the claims into a compact token with `alg` and `typ: JWT` headers
    pub fn encode(&self, claims: &Claims) -> TokenResult<String> {
        let header = JoseHeader {
            typ: Some(TOKEN_TYPE.to_string()),
            alg: self.keys.method().as_str().to_string(),
        };

        let signing_input = format!(
            "{}.{}",
            encode_segment(&header)?,
            encode_segment(claims)?
        );
        let signature = self.keys.sign(signing_input.as_bytes()).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign token");
            e
        })?;

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Decodes and validates a compact token
    ///
    /// Checks run in order: header algorithm, signature, required claims,
    /// expiry (skipped when `ignore_expired`), then not-before and issued-at.
    pub fn decode(&self, token: &str, ignore_expired: bool) -> TokenResult<Claims> {
        self.decode_at(token, ignore_expired, Utc::now().timestamp())
    }

    pub(crate) fn decode_at(
        &self,
        token: &str,
        ignore_expired: bool,
        now: i64,
    ) -> TokenResult<Claims> {
        let mut segments = token.split('.');
        let (header, body, signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(header), Some(body), Some(signature), None) => (header, body, signature),
                _ => return Err(TokenError::invalid_token("malformed token")),
            };

        let header: JoseHeader = decode_segment(header, "header")?;
        if header.alg != self.keys.method().as_str() {
            return Err(TokenError::SigningMethodMismatch {
                expected: self.keys.method().as_str().to_string(),
                found: header.alg,
            });
        }

        // Signing input is the first two segments exactly as received
        let signing_input = &token[..token.len() - signature.len() - 1];
        if !self.keys.verify(signature, signing_input.as_bytes())? {
            return Err(TokenError::invalid_token("signature verification failed"));
        }

        let raw: Map<String, Value> = decode_segment(body, "claims")?;
        for required in [CLAIM_ID, CLAIM_ISSUED_AT, CLAIM_EXPIRES_AT] {
            if !raw.contains_key(required) {
                return Err(TokenError::invalid_token(format!(
                    "missing claim: {}",
                    required
                )));
            }
        }

        let claims: Claims = serde_json::from_value(Value::Object(raw))
            .map_err(|e| TokenError::invalid_token(format!("malformed claims: {}", e)))?;

        if claims.is_expired_at(now) && !ignore_expired {
            return Err(TokenError::ExpiredToken);
        }

        if claims.is_premature_at(now) {
            return Err(TokenError::invalid_token("token used before it is valid"));
        }

        Ok(claims)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> TokenResult<String> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::TokenGenerationFailed {
        message: e.to_string(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T>(segment: &str, name: &str) -> TokenResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::invalid_token(format!("malformed {}: {}", name, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::invalid_token(format!("malformed {}: {}", name, e)))
}
