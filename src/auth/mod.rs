use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// JWT claims. `user_id` stays a raw string so a malformed value is
/// reported by the claims resolver instead of failing token decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Option<String>, name: Option<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            name,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Authenticated identity attached to a request by the auth middleware
#[derive(Debug, Clone)]
pub struct Principal {
    pub claims: Claims,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// The caller's user id, or None when there is no principal or the
/// `user_id` claim is missing or not a UUID
pub fn resolve_user(principal: Option<&Principal>) -> Option<Uuid> {
    let raw = principal?.claims.user_id.as_deref()?;
    Uuid::parse_str(raw.trim()).ok()
}

pub fn encode_claims(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Mint a token for `user_id` valid for the configured number of hours
pub fn issue_token(user_id: Uuid, name: Option<String>, security: &SecurityConfig) -> Result<String, JwtError> {
    let claims = Claims::new(Some(user_id.to_string()), name, security.jwt_expiry_hours);
    encode_claims(&claims, security)
}

pub fn decode_token(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn principal(user_id: Option<&str>) -> Principal {
        Principal {
            claims: Claims::new(user_id.map(str::to_string), None, 1),
        }
    }

    #[test]
    fn resolves_valid_user_ids_only() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_user(Some(&principal(Some(&id.to_string())))), Some(id));
        assert_eq!(resolve_user(Some(&principal(Some("not-a-guid")))), None);
        assert_eq!(resolve_user(Some(&principal(None))), None);
        assert_eq!(resolve_user(None), None);
    }

    #[test]
    fn issued_tokens_decode() {
        let security = AppConfig::development().security;
        let id = Uuid::new_v4();
        let token = issue_token(id, Some("Operator".to_string()), &security).unwrap();
        let claims = decode_token(&token, &security).unwrap();
        assert_eq!(claims.user_id, Some(id.to_string()));
        assert_eq!(claims.name.as_deref(), Some("Operator"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert!(matches!(issue_token(Uuid::new_v4(), None, &security), Err(JwtError::InvalidSecret)));
    }
}
