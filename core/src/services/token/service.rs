//! Main token service implementation

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::context::CallContext;
use crate::domain::entities::{Claims, Payload, Token};
use crate::errors::{TokenError, TokenResult};
use crate::repositories::session::SessionAdapter;

use super::codec::TokenCodec;
use super::config::TokenServiceConfig;
use super::key_manager::{SignMethod, SigningKeyManager};
use super::locator::{RequestParts, TokenLocator};
use super::session_guard::{identity_to_string, IdentitySessionGuard};

static LAST_TOKEN_ID: AtomicI64 = AtomicI64::new(0);

/// Nanosecond timestamp id, strictly increasing within the process
fn next_token_id() -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let previous = LAST_TOKEN_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    now.max(previous.saturating_add(1)).to_string()
}

/// Issues, verifies, retreads and destroys tokens
///
/// Signing and verification need no locks; the only I/O is the optional
/// session adapter, driven through the caller's [`CallContext`].
#[derive(Debug, Clone)]
pub struct TokenService {
    config: TokenServiceConfig,
    codec: TokenCodec,
    locator: TokenLocator,
    guard: IdentitySessionGuard,
}

impl TokenService {
    /// Creates a token service without a session adapter
    ///
    /// # Returns
    ///
    /// * `Ok(TokenService)` - Keys loaded and validated
    /// * `Err(TokenError)` - Invalid signing method or key material
    pub fn new(config: TokenServiceConfig) -> TokenResult<Self> {
        let keys = SigningKeyManager::configure(
            &config.sign_method,
            config.secret_key.as_deref(),
            config.public_key.as_deref(),
            config.private_key.as_deref(),
        )?;

        Ok(Self::with_keys(config, keys))
    }

    /// Creates a token service from already loaded keys
    pub fn with_keys(config: TokenServiceConfig, keys: SigningKeyManager) -> Self {
        let locator = TokenLocator::from_config(&config.locations);

        Self {
            config,
            codec: TokenCodec::new(keys),
            locator,
            guard: IdentitySessionGuard::disabled(),
        }
    }

    /// Attaches the session store used for single-active-session enforcement
    pub fn with_adapter(mut self, adapter: Arc<dyn SessionAdapter>) -> Self {
        if self.config.identity_key().is_none() {
            tracing::warn!(
                "Session adapter attached without an identity key, sessions will not be enforced"
            );
        }
        self.guard = IdentitySessionGuard::new(Some(adapter));
        self
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn sign_method(&self) -> SignMethod {
        self.codec.keys().method()
    }

    pub fn locator(&self) -> &TokenLocator {
        &self.locator
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// True when an identity key is configured and a session adapter attached
    pub fn is_enforcing_sessions(&self) -> bool {
        self.config.identity_key().is_some() && self.guard.is_active()
    }

    /// Issues a token for `payload` under the configured default issuer
    pub async fn issue_default(
        &self,
        ctx: &CallContext,
        payload: Payload,
        ttl_seconds: i64,
    ) -> TokenResult<Token> {
        let issuer = self.config.issuer.clone();
        self.issue(ctx, payload, &issuer, ttl_seconds).await
    }

    /// Issues a new token
    ///
    /// # Arguments
    ///
    /// * `payload` - Custom claims; reserved claim names are dropped
    /// * `issuer` - Value stamped into `iss`
    /// * `ttl_seconds` - Validity window; non-positive values use the default
    ///
    /// # Returns
    ///
    /// * `Ok(Token)` - Compact token with expiry and refresh times
    /// * `Err(TokenError::MissingIdentity)` - Identity key configured but absent
    pub async fn issue(
        &self,
        ctx: &CallContext,
        payload: Payload,
        issuer: &str,
        ttl_seconds: i64,
    ) -> TokenResult<Token> {
        ctx.check()?;

        let ttl = self.config.effective_ttl(ttl_seconds);
        let now = Utc::now().timestamp();
        let expires_at = now.saturating_add(ttl);
        let claims = Claims::new(next_token_id(), issuer, now, expires_at, payload);
        let identity = self.identity_of(&claims)?;

        let token = self.codec.encode(&claims)?;

        if let Some(identity) = identity {
            let session_ttl = self.config.session_ttl(ttl);
            self.guard
                .record_session(ctx, issuer, &identity, &claims.id, session_ttl)
                .await?;
        }

        tracing::info!(token_id = %claims.id, issuer = %issuer, ttl_secs = ttl, "Token issued");
        Ok(Token::new(token, claims.issued_at, claims.expires_at))
    }

    /// Locates, decodes and session-checks the token carried by `request`
    pub async fn verify<R>(
        &self,
        ctx: &CallContext,
        request: &R,
        ignore_expired: bool,
    ) -> TokenResult<Claims>
    where
        R: RequestParts + ?Sized,
    {
        ctx.check()?;
        let token = self.locate(request)?;
        self.authenticate_token(ctx, &token, ignore_expired).await
    }

    /// Verifies a raw token string, e.g. one taken from RPC metadata
    pub async fn authenticate(&self, ctx: &CallContext, token: &str) -> TokenResult<Claims> {
        ctx.check()?;
        if token.is_empty() {
            return Err(TokenError::MissingToken);
        }
        self.authenticate_token(ctx, token, false).await
    }

    /// Returns the located token with its timing metadata
    ///
    /// Session state is neither read nor written.
    pub async fn get_token<R>(
        &self,
        ctx: &CallContext,
        request: &R,
        ignore_expired: bool,
    ) -> TokenResult<Token>
    where
        R: RequestParts + ?Sized,
    {
        ctx.check()?;
        let token = self.locate(request)?;
        let claims = self.codec.decode(&token, ignore_expired)?;
        Ok(Token::new(token, claims.issued_at, claims.expires_at))
    }

    /// Re-signs a token with a fresh validity window
    ///
    /// Every claim except `iat` and `exp` is copied unchanged, including the id.
    pub async fn retread(
        &self,
        ctx: &CallContext,
        token: &str,
        ttl_seconds: i64,
        ignore_expired: bool,
    ) -> TokenResult<Token> {
        ctx.check()?;
        if token.is_empty() {
            return Err(TokenError::MissingToken);
        }

        let claims = self.codec.decode(token, ignore_expired)?;
        let identity = self.identity_of(&claims)?;

        let ttl = self.config.effective_ttl(ttl_seconds);
        let now = Utc::now().timestamp();
        let retreaded = claims.retread(now, now.saturating_add(ttl));
        let encoded = self.codec.encode(&retreaded)?;

        if let Some(identity) = identity {
            self.guard
                .check_session(ctx, &claims.issuer, &identity, &claims.id, false)
                .await?;
            let session_ttl = self.config.session_ttl(ttl);
            self.guard
                .record_session(ctx, &claims.issuer, &identity, &claims.id, session_ttl)
                .await?;
        }

        tracing::info!(token_id = %claims.id, ttl_secs = ttl, "Token retreaded");
        Ok(Token::new(encoded, retreaded.issued_at, retreaded.expires_at))
    }

    /// Retreads the located token, accepting expired ones
    pub async fn refresh<R>(
        &self,
        ctx: &CallContext,
        request: &R,
        ttl_seconds: i64,
    ) -> TokenResult<Token>
    where
        R: RequestParts + ?Sized,
    {
        ctx.check()?;
        let token = self.locate(request)?;
        self.retread(ctx, &token, ttl_seconds, true).await
    }

    /// Ends the session of the located token
    ///
    /// Expired tokens can be destroyed, and a missing session record is not
    /// an error. A token superseded by a newer login fails with
    /// `AuthenticatedElsewhere` and leaves the newer session in place.
    pub async fn destroy<R>(&self, ctx: &CallContext, request: &R) -> TokenResult<()>
    where
        R: RequestParts + ?Sized,
    {
        ctx.check()?;
        let token = self.locate(request)?;
        let claims = self.codec.decode(&token, true)?;

        if let Some(identity) = self.identity_of(&claims)? {
            self.guard
                .check_session(ctx, &claims.issuer, &identity, &claims.id, true)
                .await?;
            self.guard
                .clear_session(ctx, &claims.issuer, &identity)
                .await?;
        }

        tracing::info!(token_id = %claims.id, "Token destroyed");
        Ok(())
    }

    /// Clears an identity's session directly, invalidating its current token
    pub async fn destroy_identity(
        &self,
        ctx: &CallContext,
        issuer: &str,
        identity: &Value,
    ) -> TokenResult<()> {
        ctx.check()?;
        let identity = identity_to_string(identity);
        self.guard.clear_session(ctx, issuer, &identity).await?;
        tracing::info!(issuer = %issuer, "Identity session destroyed");
        Ok(())
    }

    /// Custom claims of the verified token
    pub async fn payload<R>(
        &self,
        ctx: &CallContext,
        request: &R,
        ignore_expired: bool,
    ) -> TokenResult<Payload>
    where
        R: RequestParts + ?Sized,
    {
        let claims = self.verify(ctx, request, ignore_expired).await?;
        Ok(claims.into_payload())
    }

    /// Identity claim of the verified token
    pub async fn identity<R>(
        &self,
        ctx: &CallContext,
        request: &R,
        ignore_expired: bool,
    ) -> TokenResult<Value>
    where
        R: RequestParts + ?Sized,
    {
        let key = self
            .config
            .identity_key()
            .ok_or_else(|| TokenError::MissingIdentity { key: String::new() })?
            .to_string();

        let claims = self.verify(ctx, request, ignore_expired).await?;
        claims
            .get(&key)
            .ok_or(TokenError::MissingIdentity { key })
    }

    fn locate<R>(&self, request: &R) -> TokenResult<String>
    where
        R: RequestParts + ?Sized,
    {
        self.locator.locate(request).ok_or(TokenError::MissingToken)
    }

    async fn authenticate_token(
        &self,
        ctx: &CallContext,
        token: &str,
        ignore_expired: bool,
    ) -> TokenResult<Claims> {
        let claims = self.codec.decode(token, ignore_expired)?;

        if let Some(identity) = self.identity_of(&claims)? {
            self.guard
                .check_session(ctx, &claims.issuer, &identity, &claims.id, false)
                .await?;
        }

        tracing::debug!(token_id = %claims.id, "Token verified");
        Ok(claims)
    }

    /// Identity string when an identity key is configured
    fn identity_of(&self, claims: &Claims) -> TokenResult<Option<String>> {
        let Some(key) = self.config.identity_key() else {
            return Ok(None);
        };

        claims
            .get(key)
            .map(|value| Some(identity_to_string(&value)))
            .ok_or_else(|| TokenError::MissingIdentity {
                key: key.to_string(),
            })
    }
}
