use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid signature encoding")]
    SignatureEncoding,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Invalid claims encoding")]
    ClaimsEncoding,
    #[error("Invalid claims format")]
    ClaimsFormat,
    #[error("Token expired")]
    Expired,
}

/// Supabase puts the platform role (`authenticated`) in `role`; the clinic
/// role lives in `app_metadata.role`. `user_metadata` is user-writable and
/// never grants a role.
fn resolve_role(claims: &JwtClaims) -> Option<String> {
    match claims.role.as_deref() {
        Some("authenticated") | Some("anon") | None => claims.app_metadata.as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| claims.role.clone()),
        Some(role) => Some(role.to_string()),
    }
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
        return Err(TokenError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        TokenError::SignatureEncoding
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(TokenError::BadSignature);
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenError::ClaimsEncoding)?;

    let claims: JwtClaims = serde_json::from_slice(&claims_bytes).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        TokenError::ClaimsFormat
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(TokenError::Expired);
        }
    }

    let created_at = claims.iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        role: resolve_role(&claims),
        id: claims.sub,
        email: claims.email,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_token_signed_with_secret() {
        let user = TestUser::clinic_owner("owner@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let decoded = validate_token(&token, SECRET).unwrap();
        assert_eq!(decoded.id, user.id);
        assert_eq!(decoded.role.as_deref(), Some("clinic_owner"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired() {
        let user = TestUser::default();
        let forged = JwtTestUtils::create_invalid_signature_token(&user);
        assert!(matches!(validate_token(&forged, SECRET), Err(TokenError::BadSignature)));

        let expired = JwtTestUtils::create_expired_token(&user, SECRET);
        assert!(matches!(validate_token(&expired, SECRET), Err(TokenError::Expired)));
    }

    #[test]
    fn rejects_malformed_and_missing_secret() {
        assert!(matches!(validate_token("a.b", SECRET), Err(TokenError::Malformed)));
        assert!(matches!(validate_token("a.b.c", ""), Err(TokenError::MissingSecret)));
    }

    #[test]
    fn role_comes_from_app_metadata_for_supabase_tokens() {
        let user = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_supabase_token(&user, SECRET);

        let decoded = validate_token(&token, SECRET).unwrap();
        assert_eq!(decoded.role.as_deref(), Some("doctor"));
    }

    #[test]
    fn user_metadata_cannot_grant_a_role() {
        let user = TestUser::patient("patient@example.com");
        let token = JwtTestUtils::create_user_metadata_role_token(&user, "admin", SECRET);

        let decoded = validate_token(&token, SECRET).unwrap();
        assert_ne!(decoded.role.as_deref(), Some("admin"));
        assert!(!decoded.is_admin());
        assert_eq!(decoded.user_role(), None);
    }
}
