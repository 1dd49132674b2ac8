//! Signing key management for every supported signing family

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{crypto, Algorithm, DecodingKey, EncodingKey};
use p521::ecdsa::signature::{Signer, Verifier};
use p521::elliptic_curve::sec1::ToEncodedPoint;
use p521::pkcs8::{DecodePrivateKey, DecodePublicKey};

use crate::errors::{TokenError, TokenResult};

const SELF_CHECK_MESSAGE: &[u8] = b"tokenwarden-key-check";

/// Signing method accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignMethod {
    #[default]
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    ES512,
}

/// Key shape required by a signing method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignFamily {
    Hmac,
    Rsa,
    Ecdsa,
}

impl SignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignMethod::HS256 => "HS256",
            SignMethod::HS384 => "HS384",
            SignMethod::HS512 => "HS512",
            SignMethod::RS256 => "RS256",
            SignMethod::RS384 => "RS384",
            SignMethod::RS512 => "RS512",
            SignMethod::ES256 => "ES256",
            SignMethod::ES384 => "ES384",
            SignMethod::ES512 => "ES512",
        }
    }

    pub fn family(&self) -> SignFamily {
        match self {
            SignMethod::HS256 | SignMethod::HS384 | SignMethod::HS512 => SignFamily::Hmac,
            SignMethod::RS256 | SignMethod::RS384 | SignMethod::RS512 => SignFamily::Rsa,
            SignMethod::ES256 | SignMethod::ES384 | SignMethod::ES512 => SignFamily::Ecdsa,
        }
    }

    /// jsonwebtoken algorithm backing this method; ES512 is signed with `p521`
    pub fn algorithm(&self) -> Option<Algorithm> {
        match self {
            SignMethod::HS256 => Some(Algorithm::HS256),
            SignMethod::HS384 => Some(Algorithm::HS384),
            SignMethod::HS512 => Some(Algorithm::HS512),
            SignMethod::RS256 => Some(Algorithm::RS256),
            SignMethod::RS384 => Some(Algorithm::RS384),
            SignMethod::RS512 => Some(Algorithm::RS512),
            SignMethod::ES256 => Some(Algorithm::ES256),
            SignMethod::ES384 => Some(Algorithm::ES384),
            SignMethod::ES512 => None,
        }
    }

    /// Parses a configured method name, falling back to HS256 when the name is
    /// empty or unrecognized
    pub fn parse_or_default(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            return SignMethod::default();
        }

        name.parse().unwrap_or_else(|_| {
            tracing::warn!(
                sign_method = %name,
                fallback = SignMethod::default().as_str(),
                "Unrecognized signing method, using default"
            );
            SignMethod::default()
        })
    }
}

impl fmt::Display for SignMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignMethod {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SignMethod::HS256),
            "HS384" => Ok(SignMethod::HS384),
            "HS512" => Ok(SignMethod::HS512),
            "RS256" => Ok(SignMethod::RS256),
            "RS384" => Ok(SignMethod::RS384),
            "RS512" => Ok(SignMethod::RS512),
            "ES256" => Ok(SignMethod::ES256),
            "ES384" => Ok(SignMethod::ES384),
            "ES512" => Ok(SignMethod::ES512),
            _ => Err(TokenError::InvalidSigningMethod {
                method: s.to_string(),
            }),
        }
    }
}

/// Where a PEM key was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOrigin {
    File(PathBuf),
    Inline,
}

/// Parsed key material, one variant per signing family
#[derive(Clone)]
pub enum KeyMaterial {
    Hmac {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    Rsa {
        encoding: EncodingKey,
        decoding: DecodingKey,
        private_origin: KeyOrigin,
        public_origin: KeyOrigin,
    },
    Ecdsa {
        keys: EcdsaKeys,
        private_origin: KeyOrigin,
        public_origin: KeyOrigin,
    },
}

/// ECDSA key pair, by curve backend
#[derive(Clone)]
pub enum EcdsaKeys {
    /// P-256 and P-384 through jsonwebtoken
    Jose {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    /// P-521 for ES512
    P521 {
        signing: Arc<p521::ecdsa::SigningKey>,
        verifying: Arc<p521::ecdsa::VerifyingKey>,
    },
}

impl KeyMaterial {
    pub fn family(&self) -> SignFamily {
        match self {
            KeyMaterial::Hmac { .. } => SignFamily::Hmac,
            KeyMaterial::Rsa { .. } => SignFamily::Rsa,
            KeyMaterial::Ecdsa { .. } => SignFamily::Ecdsa,
        }
    }
}

/// Immutable signing configuration shared by every encode/decode call
#[derive(Clone)]
pub struct SigningKeyManager {
    method: SignMethod,
    material: KeyMaterial,
}

impl fmt::Debug for SigningKeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SigningKeyManager");
        debug.field("method", &self.method);
        match &self.material {
            KeyMaterial::Hmac { .. } => {}
            KeyMaterial::Rsa {
                private_origin,
                public_origin,
                ..
            }
            | KeyMaterial::Ecdsa {
                private_origin,
                public_origin,
                ..
            } => {
                debug
                    .field("private_key", private_origin)
                    .field("public_key", public_origin);
            }
        }
        debug.finish_non_exhaustive()
    }
}

impl SigningKeyManager {
    /// Loads and validates key material for the configured signing method
    ///
    /// # Arguments
    ///
    /// * `sign_method` - Method name; empty or unrecognized names fall back to HS256
    /// * `secret` - Shared secret, required for the HMAC family
    /// * `public_key` - PEM text or path to a PEM file, required for RSA/ECDSA
    /// * `private_key` - PEM text or path to a PEM file, required for RSA/ECDSA
    ///
    /// # Returns
    ///
    /// * `Ok(SigningKeyManager)` - Keys loaded and a test signature verified
    /// * `Err(TokenError)` - One of the configuration error kinds
    pub fn configure(
        sign_method: &str,
        secret: Option<&str>,
        public_key: Option<&str>,
        private_key: Option<&str>,
    ) -> TokenResult<Self> {
        let method = SignMethod::parse_or_default(sign_method);
        Self::with_method(method, secret, public_key, private_key)
    }

    /// Same as [`configure`](Self::configure) with an already parsed method
    pub fn with_method(
        method: SignMethod,
        secret: Option<&str>,
        public_key: Option<&str>,
        private_key: Option<&str>,
    ) -> TokenResult<Self> {
        let material = match method.family() {
            SignFamily::Hmac => {
                let secret = secret
                    .filter(|s| !s.is_empty())
                    .ok_or(TokenError::InvalidSecretKey)?;
                KeyMaterial::Hmac {
                    encoding: EncodingKey::from_secret(secret.as_bytes()),
                    decoding: DecodingKey::from_secret(secret.as_bytes()),
                }
            }
            family => {
                let (public_pem, public_origin) =
                    resolve_key_source(public_key).map_err(invalid_public)?;
                let (private_pem, private_origin) =
                    resolve_key_source(private_key).map_err(invalid_private)?;

                match family {
                    SignFamily::Rsa => KeyMaterial::Rsa {
                        encoding: EncodingKey::from_rsa_pem(&private_pem).map_err(|e| {
                            invalid_private(format!("Invalid RSA private key: {}", e))
                        })?,
                        decoding: DecodingKey::from_rsa_pem(&public_pem).map_err(|e| {
                            invalid_public(format!("Invalid RSA public key: {}", e))
                        })?,
                        private_origin,
                        public_origin,
                    },
                    _ => KeyMaterial::Ecdsa {
                        keys: load_ecdsa_keys(method, &public_pem, &private_pem)?,
                        private_origin,
                        public_origin,
                    },
                }
            }
        };

        let manager = Self { method, material };
        manager.self_check()?;

        tracing::info!(sign_method = %method, "Signing keys loaded");
        Ok(manager)
    }

    /// Convenience constructor for the HMAC family
    pub fn from_secret(method: SignMethod, secret: &str) -> TokenResult<Self> {
        Self::with_method(method, Some(secret), None, None)
    }

    /// Convenience constructor for RSA/ECDSA key pairs given as PEM text or paths
    pub fn from_key_pair(
        method: SignMethod,
        public_key: &str,
        private_key: &str,
    ) -> TokenResult<Self> {
        Self::with_method(method, None, Some(public_key), Some(private_key))
    }

    pub fn method(&self) -> SignMethod {
        self.method
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.method.algorithm()
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Encoding key for the jsonwebtoken-backed methods
    pub fn encoding_key(&self) -> Option<&EncodingKey> {
        match &self.material {
            KeyMaterial::Hmac { encoding, .. }
            | KeyMaterial::Rsa { encoding, .. }
            | KeyMaterial::Ecdsa {
                keys: EcdsaKeys::Jose { encoding, .. },
                ..
            } => Some(encoding),
            KeyMaterial::Ecdsa {
                keys: EcdsaKeys::P521 { .. },
                ..
            } => None,
        }
    }

    /// Decoding key for the jsonwebtoken-backed methods
    pub fn decoding_key(&self) -> Option<&DecodingKey> {
        match &self.material {
            KeyMaterial::Hmac { decoding, .. }
            | KeyMaterial::Rsa { decoding, .. }
            | KeyMaterial::Ecdsa {
                keys: EcdsaKeys::Jose { decoding, .. },
                ..
            } => Some(decoding),
            KeyMaterial::Ecdsa {
                keys: EcdsaKeys::P521 { .. },
                ..
            } => None,
        }
    }

    /// Signs a JWS signing input and returns the base64url signature
    pub fn sign(&self, message: &[u8]) -> TokenResult<String> {
        if let KeyMaterial::Ecdsa {
            keys: EcdsaKeys::P521 { signing, .. },
            ..
        } = &self.material
        {
            let signature: p521::ecdsa::Signature =
                signing.try_sign(message).map_err(generation_failed)?;
            return Ok(URL_SAFE_NO_PAD.encode(signature.to_bytes()));
        }

        match (self.algorithm(), self.encoding_key()) {
            (Some(algorithm), Some(key)) => {
                crypto::sign(message, key, algorithm).map_err(generation_failed)
            }
            _ => Err(generation_failed(format!("no signer for {}", self.method))),
        }
    }

    /// Checks a base64url signature over a JWS signing input
    ///
    /// `Ok(false)` means the signature is well-formed but does not match.
    pub fn verify(&self, signature: &str, message: &[u8]) -> TokenResult<bool> {
        if let KeyMaterial::Ecdsa {
            keys: EcdsaKeys::P521 { verifying, .. },
            ..
        } = &self.material
        {
            let bytes = URL_SAFE_NO_PAD
                .decode(signature)
                .map_err(|e| TokenError::invalid_token(format!("malformed signature: {}", e)))?;
            let signature = p521::ecdsa::Signature::from_slice(&bytes)
                .map_err(|e| TokenError::invalid_token(format!("malformed signature: {}", e)))?;
            return Ok(verifying.verify(message, &signature).is_ok());
        }

        match (self.algorithm(), self.decoding_key()) {
            (Some(algorithm), Some(key)) => crypto::verify(signature, message, key, algorithm)
                .map_err(|e| TokenError::invalid_token(e.to_string())),
            _ => Err(TokenError::invalid_token(format!(
                "no verifier for {}",
                self.method
            ))),
        }
    }

    /// Signs and verifies a fixed message so a broken or mismatched pair is
    /// rejected before the engine starts
    fn self_check(&self) -> TokenResult<()> {
        let signature = self.sign(SELF_CHECK_MESSAGE).map_err(|e| {
            invalid_private(format!("Key cannot sign with {}: {}", self.method, e))
        })?;

        match self.verify(&signature, SELF_CHECK_MESSAGE) {
            Ok(true) => Ok(()),
            Ok(false) => Err(invalid_public(
                "Public key does not match the private key".to_string(),
            )),
            Err(e) => Err(invalid_public(format!(
                "Key cannot verify with {}: {}",
                self.method, e
            ))),
        }
    }
}

fn load_ecdsa_keys(
    method: SignMethod,
    public_pem: &[u8],
    private_pem: &[u8],
) -> TokenResult<EcdsaKeys> {
    if method != SignMethod::ES512 {
        return Ok(EcdsaKeys::Jose {
            encoding: EncodingKey::from_ec_pem(private_pem)
                .map_err(|e| invalid_private(format!("Invalid EC private key: {}", e)))?,
            decoding: DecodingKey::from_ec_pem(public_pem)
                .map_err(|e| invalid_public(format!("Invalid EC public key: {}", e)))?,
        });
    }

    let private_pem = std::str::from_utf8(private_pem)
        .map_err(|e| invalid_private(format!("Invalid EC private key: {}", e)))?;
    let secret = p521::SecretKey::from_pkcs8_pem(private_pem)
        .or_else(|_| p521::SecretKey::from_sec1_pem(private_pem))
        .map_err(|e| invalid_private(format!("Invalid P-521 private key: {}", e)))?;
    let signing = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
        .map_err(|e| invalid_private(format!("Invalid P-521 private key: {}", e)))?;

    let public_pem = std::str::from_utf8(public_pem)
        .map_err(|e| invalid_public(format!("Invalid EC public key: {}", e)))?;
    let public = p521::PublicKey::from_public_key_pem(public_pem)
        .map_err(|e| invalid_public(format!("Invalid P-521 public key: {}", e)))?;
    let verifying =
        p521::ecdsa::VerifyingKey::from_sec1_bytes(public.to_encoded_point(false).as_bytes())
            .map_err(|e| invalid_public(format!("Invalid P-521 public key: {}", e)))?;

    Ok(EcdsaKeys::P521 {
        signing: Arc::new(signing),
        verifying: Arc::new(verifying),
    })
}

/// Resolves a key source: an existing non-empty file is read, anything else
/// is taken as PEM text
fn resolve_key_source(source: Option<&str>) -> Result<(Vec<u8>, KeyOrigin), String> {
    let source = source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Key is required for this signing method".to_string())?;

    let path = Path::new(source);
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            if meta.len() == 0 {
                return Err(format!("Key file is empty: {}", path.display()));
            }
            let bytes = fs::read(path)
                .map_err(|e| format!("Failed to read key file {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "Loaded key from file");
            Ok((bytes, KeyOrigin::File(path.to_path_buf())))
        }
        _ => Ok((source.as_bytes().to_vec(), KeyOrigin::Inline)),
    }
}

fn invalid_public(message: String) -> TokenError {
    TokenError::InvalidPublicKey { message }
}

fn invalid_private(message: String) -> TokenError {
    TokenError::InvalidPrivateKey { message }
}

fn generation_failed(error: impl fmt::Display) -> TokenError {
    TokenError::TokenGenerationFailed {
        message: error.to_string(),
    }
}
