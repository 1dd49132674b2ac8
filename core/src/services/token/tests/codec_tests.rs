//! Tests for compact token encoding and decoding

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::json;

use super::fixtures::*;
use crate::domain::entities::Claims;
use crate::errors::TokenError;
use crate::services::token::{SignMethod, SigningKeyManager, TokenCodec};

fn hmac_codec(method: SignMethod) -> TokenCodec {
    TokenCodec::new(SigningKeyManager::from_secret(method, SECRET).unwrap())
}

fn claims_valid_for(seconds: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims::new("1001", "app", now, now + seconds, payload(json!({ "role": "admin" })))
}

fn segment(token: &str, index: usize) -> serde_json::Value {
    let part = token.split('.').nth(index).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
}

#[test]
fn test_header_carries_alg_and_typ() {
    let codec = hmac_codec(SignMethod::HS384);
    let token = codec.encode(&claims_valid_for(60)).unwrap();

    assert_eq!(token.split('.').count(), 3);
    let header = segment(&token, 0);
    assert_eq!(header["alg"], json!("HS384"));
    assert_eq!(header["typ"], json!("JWT"));
}

#[test]
fn test_payload_uses_registered_claim_names() {
    let codec = hmac_codec(SignMethod::HS256);
    let claims = claims_valid_for(60);
    let token = codec.encode(&claims).unwrap();

    let body = segment(&token, 1);
    assert_eq!(body["jti"], json!("1001"));
    assert_eq!(body["iss"], json!("app"));
    assert_eq!(body["exp"], json!(claims.expires_at));
    assert_eq!(body["role"], json!("admin"));
}

#[test]
fn test_decode_round_trip_for_each_family() {
    let managers = vec![
        SigningKeyManager::from_secret(SignMethod::HS256, SECRET).unwrap(),
        SigningKeyManager::from_key_pair(SignMethod::RS256, RSA_PUBLIC, RSA_PRIVATE).unwrap(),
        SigningKeyManager::from_key_pair(SignMethod::ES256, EC256_PUBLIC, EC256_PRIVATE).unwrap(),
        SigningKeyManager::from_key_pair(SignMethod::ES384, EC384_PUBLIC, EC384_PRIVATE).unwrap(),
        SigningKeyManager::from_key_pair(SignMethod::ES512, EC521_PUBLIC, EC521_PRIVATE).unwrap(),
    ];

    for manager in managers {
        let method = manager.method();
        let codec = TokenCodec::new(manager);
        let claims = claims_valid_for(60);
        let token = codec.encode(&claims).unwrap();
        let decoded = codec.decode(&token, false).unwrap();
        assert_eq!(decoded, claims, "round trip failed for {}", method);
    }
}

#[test]
fn test_expired_token() {
    let codec = hmac_codec(SignMethod::HS256);
    let now = Utc::now().timestamp();
    let claims = Claims::new("1", "app", now - 120, now - 60, payload(json!({ "role": "admin" })));
    let token = codec.encode(&claims).unwrap();

    assert!(matches!(codec.decode(&token, false), Err(TokenError::ExpiredToken)));

    let decoded = codec.decode(&token, true).unwrap();
    assert_eq!(decoded.custom["role"], json!("admin"));
}

#[test]
fn test_token_is_valid_until_its_expiry_second() {
    let codec = hmac_codec(SignMethod::HS256);
    let claims = Claims::new("1", "app", 100, 200, payload(json!({})));
    let token = codec.encode(&claims).unwrap();

    assert!(codec.decode_at(&token, false, 200).is_ok());
    assert!(matches!(
        codec.decode_at(&token, false, 201),
        Err(TokenError::ExpiredToken)
    ));
}

#[test]
fn test_algorithm_mismatch() {
    let hs256 = hmac_codec(SignMethod::HS256);
    let hs512 = hmac_codec(SignMethod::HS512);
    let token = hs512.encode(&claims_valid_for(60)).unwrap();

    match hs256.decode(&token, false) {
        Err(TokenError::SigningMethodMismatch { expected, found }) => {
            assert_eq!(expected, "HS256");
            assert_eq!(found, "HS512");
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
}

#[test]
fn test_wrong_secret_is_invalid() {
    let codec = hmac_codec(SignMethod::HS256);
    let other_keys = SigningKeyManager::from_secret(SignMethod::HS256, "other-secret").unwrap();
    let other = TokenCodec::new(other_keys);
    let token = other.encode(&claims_valid_for(60)).unwrap();

    assert!(matches!(codec.decode(&token, false), Err(TokenError::InvalidToken { .. })));
}

#[test]
fn test_bad_signature_is_invalid_even_when_ignoring_expiry() {
    let codec = hmac_codec(SignMethod::HS256);
    let now = Utc::now().timestamp();
    let expired = Claims::new("1", "app", now - 120, now - 60, payload(json!({})));
    let token = codec.encode(&expired).unwrap();

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut signature = URL_SAFE_NO_PAD.decode(&parts[2]).unwrap();
    signature[0] ^= 0x01;
    parts[2] = URL_SAFE_NO_PAD.encode(signature);
    let tampered = parts.join(".");

    assert!(matches!(codec.decode(&tampered, true), Err(TokenError::InvalidToken { .. })));
    assert!(matches!(codec.decode(&tampered, false), Err(TokenError::InvalidToken { .. })));
}

#[test]
fn test_malformed_tokens_are_invalid() {
    let codec = hmac_codec(SignMethod::HS256);

    for token in ["", "abc", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.bm90LWpzb24.c2ln"] {
        assert!(
            matches!(codec.decode(token, false), Err(TokenError::InvalidToken { .. })),
            "token {:?} should be invalid",
            token
        );
    }
}

#[test]
fn test_missing_required_claims() {
    let keys = SigningKeyManager::from_secret(SignMethod::HS256, SECRET).unwrap();
    let codec = TokenCodec::new(keys.clone());
    let now = Utc::now().timestamp();

    let body = json!({ "iat": now, "exp": now + 60, "role": "admin" });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(keys.algorithm().unwrap()),
        &body,
        keys.encoding_key().unwrap(),
    )
    .unwrap();

    match codec.decode(&token, false) {
        Err(TokenError::InvalidToken { reason }) => assert!(reason.contains("jti")),
        other => panic!("expected invalid token, got {:?}", other),
    }
}

#[test]
fn test_not_yet_valid_tokens_are_invalid() {
    let codec = hmac_codec(SignMethod::HS256);
    let now = Utc::now().timestamp();

    let mut claims = Claims::new("1", "app", now, now + 600, payload(json!({})));
    claims.not_before = Some(now + 300);
    let token = codec.encode(&claims).unwrap();
    assert!(matches!(codec.decode(&token, false), Err(TokenError::InvalidToken { .. })));

    let future = Claims::new("2", "app", now + 300, now + 600, payload(json!({})));
    let token = codec.encode(&future).unwrap();
    assert!(matches!(codec.decode(&token, false), Err(TokenError::InvalidToken { .. })));
}

#[test]
fn test_tokens_from_jsonwebtoken_are_accepted() {
    let keys =
        SigningKeyManager::from_key_pair(SignMethod::RS256, RSA_PUBLIC, RSA_PRIVATE).unwrap();
    let codec = TokenCodec::new(keys.clone());
    let now = Utc::now().timestamp();

    let body = json!({ "jti": "42", "iss": "other", "iat": now, "exp": now + 60, "role": "ops" });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
        &body,
        keys.encoding_key().unwrap(),
    )
    .unwrap();

    let claims = codec.decode(&token, false).unwrap();
    assert_eq!(claims.id, "42");
    assert_eq!(claims.custom["role"], json!("ops"));
}

#[test]
fn test_fractional_numeric_dates_from_other_issuers() {
    let keys = SigningKeyManager::from_secret(SignMethod::HS256, SECRET).unwrap();
    let codec = TokenCodec::new(keys.clone());
    let now = Utc::now().timestamp();

    let body = json!({
        "jti": "1",
        "iat": now as f64 - 0.5,
        "exp": now as f64 + 3600.5,
        "role": "admin"
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &body,
        keys.encoding_key().unwrap(),
    )
    .unwrap();

    let claims = codec.decode(&token, false).unwrap();
    assert_eq!(claims.issued_at, now - 1);
    assert_eq!(claims.expires_at, now + 3600);
    assert_eq!(claims.custom["role"], json!("admin"));
}

#[test]
fn test_es512_header_and_signature_size() {
    let keys =
        SigningKeyManager::from_key_pair(SignMethod::ES512, EC521_PUBLIC, EC521_PRIVATE).unwrap();
    let codec = TokenCodec::new(keys);
    let token = codec.encode(&claims_valid_for(60)).unwrap();

    assert_eq!(segment(&token, 0)["alg"], json!("ES512"));
    let signature = URL_SAFE_NO_PAD.decode(token.split('.').nth(2).unwrap()).unwrap();
    assert_eq!(signature.len(), 132);

    let es256 = TokenCodec::new(
        SigningKeyManager::from_key_pair(SignMethod::ES256, EC256_PUBLIC, EC256_PRIVATE).unwrap(),
    );
    assert!(matches!(
        es256.decode(&token, false),
        Err(TokenError::SigningMethodMismatch { .. })
    ));
}

#[test]
fn test_tampered_es512_signature_is_invalid() {
    let codec = TokenCodec::new(
        SigningKeyManager::from_key_pair(SignMethod::ES512, EC521_PUBLIC, EC521_PRIVATE).unwrap(),
    );
    let token = codec.encode(&claims_valid_for(60)).unwrap();

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut signature = URL_SAFE_NO_PAD.decode(&parts[2]).unwrap();
    signature[10] ^= 0x01;
    parts[2] = URL_SAFE_NO_PAD.encode(signature);

    assert!(matches!(
        codec.decode(&parts.join("."), true),
        Err(TokenError::InvalidToken { .. })
    ));
}
