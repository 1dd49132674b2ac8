//! Tests for the token lifecycle service

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::fixtures::*;
use crate::context::CallContext;
use crate::domain::entities::{Payload, DEFAULT_SESSION_GRACE_SECONDS, MAX_TOKEN_TTL_SECONDS};
use crate::errors::TokenError;
use crate::repositories::session::{AdapterError, MemorySessionAdapter, SessionAdapter};
use crate::services::token::{RequestContext, SignMethod, TokenService, TokenServiceConfig};

fn hmac_service() -> TokenService {
    TokenService::new(TokenServiceConfig::hmac("HS256", SECRET)).unwrap()
}

fn guarded_service() -> (TokenService, Arc<MemorySessionAdapter>) {
    let adapter = Arc::new(MemorySessionAdapter::new());
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_identity_key("uid"),
    )
    .unwrap()
    .with_adapter(adapter.clone());
    (service, adapter)
}

fn bearer(token: &str) -> RequestContext {
    RequestContext::new().with_bearer(token)
}

#[tokio::test]
async fn test_issue_and_verify() {
    let service = hmac_service();
    let ctx = CallContext::background();

    let token = service
        .issue(&ctx, payload(json!({ "role": "admin", "uid": 7 })), "app", 600)
        .await
        .unwrap();

    let claims = service.verify(&ctx, &bearer(&token.token), false).await.unwrap();
    assert_eq!(claims.issuer, "app");
    assert_eq!(claims.expires_at - claims.issued_at, 600);
    assert_eq!(claims.custom["role"], json!("admin"));
    assert_eq!(claims.custom["uid"], json!(7));
    assert!(!claims.id.is_empty());
}

#[tokio::test]
async fn test_issue_metadata() {
    let service = hmac_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, Payload::new(), "app", 100).await.unwrap();
    let span = (token.expires_at - token.refresh_at).num_seconds();
    assert_eq!(span, 50);
}

#[tokio::test]
async fn test_non_positive_ttl_uses_default() {
    let service = hmac_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, Payload::new(), "app", 0).await.unwrap();
    let claims = service.authenticate(&ctx, &token.token).await.unwrap();
    assert_eq!(claims.expires_at - claims.issued_at, 3600);

    let short_default = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_default_ttl(120),
    )
    .unwrap();
    let token = short_default.issue(&ctx, Payload::new(), "app", -5).await.unwrap();
    let claims = short_default.authenticate(&ctx, &token.token).await.unwrap();
    assert_eq!(claims.expires_at - claims.issued_at, 120);
}

#[tokio::test]
async fn test_reserved_claims_cannot_be_overridden() {
    let service = hmac_service();
    let ctx = CallContext::background();

    let token = service
        .issue(
            &ctx,
            payload(json!({ "exp": 1, "iss": "forged", "jti": "x", "role": "user" })),
            "app",
            60,
        )
        .await
        .unwrap();

    let claims = service.authenticate(&ctx, &token.token).await.unwrap();
    assert_eq!(claims.issuer, "app");
    assert_ne!(claims.id, "x");
    assert!(claims.expires_at > 1);
    assert_eq!(claims.custom.len(), 1);
}

#[tokio::test]
async fn test_issue_default_uses_configured_issuer() {
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_issuer("billing"),
    )
    .unwrap();
    let ctx = CallContext::background();

    let token = service.issue_default(&ctx, Payload::new(), 60).await.unwrap();
    let claims = service.authenticate(&ctx, &token.token).await.unwrap();
    assert_eq!(claims.issuer, "billing");
}

#[tokio::test]
async fn test_token_ids_are_unique() {
    let service = hmac_service();
    let ctx = CallContext::background();
    let mut ids = std::collections::HashSet::new();

    for _ in 0..50 {
        let token = service.issue(&ctx, Payload::new(), "app", 60).await.unwrap();
        let claims = service.authenticate(&ctx, &token.token).await.unwrap();
        assert!(ids.insert(claims.id));
    }
}

#[tokio::test]
async fn test_missing_token() {
    let service = hmac_service();
    let ctx = CallContext::background();

    let result = service.verify(&ctx, &RequestContext::new(), false).await;
    assert!(matches!(result, Err(TokenError::MissingToken)));

    let result = service.authenticate(&ctx, "").await;
    assert!(matches!(result, Err(TokenError::MissingToken)));

    let result = service.retread(&ctx, "", 60, false).await;
    assert!(matches!(result, Err(TokenError::MissingToken)));

    let result = service.destroy(&ctx, &RequestContext::new()).await;
    assert!(matches!(result, Err(TokenError::MissingToken)));
}

#[tokio::test]
async fn test_identity_required_when_configured() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let result = service.issue(&ctx, payload(json!({ "role": "admin" })), "app", 60).await;
    match result {
        Err(TokenError::MissingIdentity { key }) => assert_eq!(key, "uid"),
        other => panic!("expected MissingIdentity, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identity_required_without_adapter() {
    let identity_config = TokenServiceConfig::hmac("HS256", SECRET).with_identity_key("uid");
    let service = TokenService::new(identity_config).unwrap();
    let ctx = CallContext::background();

    assert!(!service.is_enforcing_sessions());
    let result = service.issue(&ctx, Payload::new(), "app", 60).await;
    assert!(matches!(result, Err(TokenError::MissingIdentity { .. })));

    service
        .issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_issue_records_session() {
    let (service, adapter) = guarded_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    let claims = service.authenticate(&ctx, &token.token).await.unwrap();

    let stored = adapter.get(&ctx, "jwt:app:identity:u1").await.unwrap();
    assert_eq!(stored, Some(claims.id));
}

#[tokio::test]
async fn test_numeric_identity_key() {
    let (service, adapter) = guarded_service();
    let ctx = CallContext::background();

    service.issue(&ctx, payload(json!({ "uid": 42 })), "app", 60).await.unwrap();
    assert!(adapter.get(&ctx, "jwt:app:identity:42").await.unwrap().is_some());
}

#[tokio::test]
async fn test_newer_login_supersedes_older_token() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let first = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    let second = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();

    let result = service.verify(&ctx, &bearer(&first.token), false).await;
    assert!(matches!(result, Err(TokenError::AuthenticatedElsewhere)));
    service.verify(&ctx, &bearer(&second.token), false).await.unwrap();
}

#[tokio::test]
async fn test_sessions_are_scoped_by_issuer() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let web = service.issue(&ctx, payload(json!({ "uid": "u1" })), "web", 60).await.unwrap();
    let mobile = service.issue(&ctx, payload(json!({ "uid": "u1" })), "mobile", 60).await.unwrap();

    service.authenticate(&ctx, &web.token).await.unwrap();
    service.authenticate(&ctx, &mobile.token).await.unwrap();
}

#[tokio::test]
async fn test_verify_without_session_record_is_invalid() {
    let (service, adapter) = guarded_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    adapter.delete(&ctx, "jwt:app:identity:u1").await.unwrap();

    let result = service.authenticate(&ctx, &token.token).await;
    assert!(matches!(result, Err(TokenError::InvalidToken { .. })));
}

#[tokio::test]
async fn test_retread_keeps_id_and_claims() {
    let (service, adapter) = guarded_service();
    let ctx = CallContext::background();

    let original = service
        .issue(&ctx, payload(json!({ "uid": "u1", "role": "admin" })), "app", 60)
        .await
        .unwrap();
    let before = service.authenticate(&ctx, &original.token).await.unwrap();

    let retreaded = service.retread(&ctx, &original.token, 600, false).await.unwrap();
    let after = service.authenticate(&ctx, &retreaded.token).await.unwrap();

    assert_eq!(after.id, before.id);
    assert_eq!(after.issuer, before.issuer);
    assert_eq!(after.custom, before.custom);
    assert_eq!(after.expires_at - after.issued_at, 600);
    assert_eq!(
        adapter.get(&ctx, "jwt:app:identity:u1").await.unwrap(),
        Some(before.id)
    );
}

#[tokio::test]
async fn test_retread_of_superseded_token_fails() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let old = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();

    let result = service.retread(&ctx, &old.token, 60, false).await;
    assert!(matches!(result, Err(TokenError::AuthenticatedElsewhere)));
}

#[tokio::test]
async fn test_refresh_uses_located_token() {
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_locations("query:token"),
    )
    .unwrap();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, payload(json!({ "role": "admin" })), "app", 60).await.unwrap();
    let request = RequestContext::new().with_query("token", token.token.clone());

    let refreshed = service.refresh(&ctx, &request, 300).await.unwrap();
    let claims = service.authenticate(&ctx, &refreshed.token).await.unwrap();
    assert_eq!(claims.expires_at - claims.issued_at, 300);
    assert_eq!(claims.custom["role"], json!("admin"));

    let result = service.refresh(&ctx, &RequestContext::new(), 300).await;
    assert!(matches!(result, Err(TokenError::MissingToken)));
}

#[tokio::test]
async fn test_get_token_returns_metadata_without_session_check() {
    let (service, adapter) = guarded_service();
    let ctx = CallContext::background();

    let issued = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    adapter.delete(&ctx, "jwt:app:identity:u1").await.unwrap();

    let token = service.get_token(&ctx, &bearer(&issued.token), false).await.unwrap();
    assert_eq!(token, issued);
}

#[tokio::test]
async fn test_destroy_ends_session() {
    let (service, adapter) = guarded_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    let request = bearer(&token.token);

    service.destroy(&ctx, &request).await.unwrap();
    assert!(adapter.get(&ctx, "jwt:app:identity:u1").await.unwrap().is_none());

    let result = service.verify(&ctx, &request, false).await;
    assert!(matches!(result, Err(TokenError::InvalidToken { .. })));

    // A second destroy finds no record and still succeeds
    service.destroy(&ctx, &request).await.unwrap();
}

#[tokio::test]
async fn test_destroy_superseded_token_keeps_newer_session() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let old = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    let new = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();

    let result = service.destroy(&ctx, &bearer(&old.token)).await;
    assert!(matches!(result, Err(TokenError::AuthenticatedElsewhere)));
    service.authenticate(&ctx, &new.token).await.unwrap();
}

#[tokio::test]
async fn test_destroy_identity() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, payload(json!({ "uid": 9 })), "app", 60).await.unwrap();
    service.destroy_identity(&ctx, "app", &json!(9)).await.unwrap();

    let result = service.authenticate(&ctx, &token.token).await;
    assert!(matches!(result, Err(TokenError::InvalidToken { .. })));
}

#[tokio::test]
async fn test_payload_and_identity_helpers() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let token = service
        .issue(&ctx, payload(json!({ "uid": "u1", "role": "admin" })), "app", 60)
        .await
        .unwrap();
    let request = bearer(&token.token);

    let claims = service.payload(&ctx, &request, false).await.unwrap();
    assert_eq!(claims.len(), 2);
    assert!(!claims.contains_key("jti"));

    let identity = service.identity(&ctx, &request, false).await.unwrap();
    assert_eq!(identity, json!("u1"));
}

#[tokio::test]
async fn test_identity_helper_requires_identity_key() {
    let service = hmac_service();
    let ctx = CallContext::background();

    let token = service.issue(&ctx, Payload::new(), "app", 60).await.unwrap();
    let result = service.identity(&ctx, &bearer(&token.token), false).await;
    assert!(matches!(result, Err(TokenError::MissingIdentity { .. })));
}

#[tokio::test]
async fn test_asymmetric_service() {
    let config = TokenServiceConfig::key_pair("ES256", EC256_PUBLIC, EC256_PRIVATE);
    let service = TokenService::new(config).unwrap();
    let ctx = CallContext::background();

    assert_eq!(service.sign_method(), SignMethod::ES256);
    let token = service.issue(&ctx, payload(json!({ "scope": "read" })), "app", 60).await.unwrap();
    let claims = service.authenticate(&ctx, &token.token).await.unwrap();
    assert_eq!(claims.custom["scope"], json!("read"));
}

#[tokio::test]
async fn test_tokens_from_other_algorithm_are_rejected() {
    let hs = hmac_service();
    let rs_config = TokenServiceConfig::key_pair("RS256", RSA_PUBLIC, RSA_PRIVATE);
    let rs = TokenService::new(rs_config).unwrap();
    let ctx = CallContext::background();

    let token = rs.issue(&ctx, Payload::new(), "app", 60).await.unwrap();
    let result = hs.authenticate(&ctx, &token.token).await;
    assert!(matches!(result, Err(TokenError::SigningMethodMismatch { .. })));
}

#[tokio::test]
async fn test_cancelled_context() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();
    ctx.cancel();

    let result = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await;
    assert!(matches!(result, Err(TokenError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_adapter_hits_deadline() {
    let adapter = Arc::new(RecordingAdapter::slow(Duration::from_secs(30)));
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_identity_key("uid"),
    )
    .unwrap()
    .with_adapter(adapter);
    let ctx = CallContext::background().with_timeout(Duration::from_secs(1));

    let result = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await;
    match result {
        Err(error @ TokenError::DeadlineExceeded) => assert!(error.is_retryable()),
        other => panic!("expected DeadlineExceeded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_adapter_failure_fails_issue() {
    let adapter = Arc::new(RecordingAdapter::failing(AdapterError::operation("READONLY")));
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_identity_key("uid"),
    )
    .unwrap()
    .with_adapter(adapter);
    let ctx = CallContext::background();

    let result = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await;
    assert!(matches!(result, Err(TokenError::Adapter(AdapterError::Operation { .. }))));
}

#[test]
fn test_invalid_configuration_prevents_construction() {
    let result = TokenService::new(TokenServiceConfig::hmac("HS256", ""));
    assert!(matches!(result, Err(TokenError::InvalidSecretKey)));

    let result = TokenService::new(TokenServiceConfig::key_pair("RS256", "bad", "bad"));
    assert!(result.unwrap_err().is_configuration());
}

#[test]
fn test_ttl_bounds() {
    let config = TokenServiceConfig::hmac("HS256", SECRET).with_session_grace(30);

    assert_eq!(config.effective_ttl(i64::MAX), MAX_TOKEN_TTL_SECONDS);
    assert_eq!(config.session_ttl(60), Duration::from_secs(90));
    assert_eq!(config.session_ttl(-5), Duration::from_secs(30));
    assert_eq!(
        config.session_ttl(i64::MAX),
        Duration::from_secs(i64::MAX as u64)
    );
}

#[tokio::test]
async fn test_session_record_outlives_token() {
    let adapter = shared(RecordingAdapter::new());
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET).with_identity_key("uid"),
    )
    .unwrap()
    .with_adapter(adapter.clone());
    let ctx = CallContext::background();

    service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();

    let expected = Duration::from_secs((60 + DEFAULT_SESSION_GRACE_SECONDS) as u64);
    assert_eq!(adapter.ttl("jwt:app:identity:u1").await, Some(expected));
}

#[tokio::test]
async fn test_zero_grace_ties_session_to_token_lifetime() {
    let adapter = shared(RecordingAdapter::new());
    let service = TokenService::new(
        TokenServiceConfig::hmac("HS256", SECRET)
            .with_identity_key("uid")
            .with_session_grace(0),
    )
    .unwrap()
    .with_adapter(adapter.clone());
    let ctx = CallContext::background();

    let token = service.issue(&ctx, payload(json!({ "uid": "u1" })), "app", 60).await.unwrap();
    service.retread(&ctx, &token.token, 120, false).await.unwrap();

    assert_eq!(
        adapter.ttl("jwt:app:identity:u1").await,
        Some(Duration::from_secs(120))
    );
}

#[tokio::test]
async fn test_huge_ttl_is_clamped() {
    let (service, _) = guarded_service();
    let ctx = CallContext::background();

    let token = service
        .issue(&ctx, payload(json!({ "uid": "u1" })), "app", i64::MAX)
        .await
        .unwrap();
    let claims = service.authenticate(&ctx, &token.token).await.unwrap();
    assert_eq!(claims.expires_at - claims.issued_at, MAX_TOKEN_TTL_SECONDS);

    let retreaded = service.retread(&ctx, &token.token, i64::MAX, false).await.unwrap();
    let claims = service.authenticate(&ctx, &retreaded.token).await.unwrap();
    assert_eq!(claims.expires_at - claims.issued_at, MAX_TOKEN_TTL_SECONDS);
}

#[tokio::test]
async fn test_es512_service_round_trip() {
    let config = TokenServiceConfig::key_pair("ES512", EC521_PUBLIC, EC521_PRIVATE);
    let service = TokenService::new(config).unwrap();
    let ctx = CallContext::background();

    assert_eq!(service.sign_method(), SignMethod::ES512);
    let token = service
        .issue(&ctx, payload(json!({ "role": "admin" })), "app", 60)
        .await
        .unwrap();
    let claims = service.verify(&ctx, &bearer(&token.token), false).await.unwrap();
    assert_eq!(claims.custom["role"], json!("admin"));

    let retreaded = service.retread(&ctx, &token.token, 120, false).await.unwrap();
    assert_eq!(service.authenticate(&ctx, &retreaded.token).await.unwrap().id, claims.id);
}
