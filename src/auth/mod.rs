use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Token rejection reasons. The messages are part of the API contract:
/// clients retry on `Token Expired` but not on the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No Token")]
    NoToken,
    #[error("Token Expired")]
    TokenExpired,
    #[error("Authorization Failed")]
    AuthorizationFailed,
}

/// Decoded token payload. Core identity fields are typed; anything else a
/// token carries survives the round trip through `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, email: impl Into<String>, role: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: sub.into(),
            email: email.into(),
            role: role.into(),
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            extra: Map::new(),
        }
    }
}

/// Encodes and decodes bearer tokens. Constructed once at startup and cloned
/// into the middleware stack.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    algorithm: Algorithm,
    expiry_min: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, algorithm: Algorithm, expiry_min: i64) -> Self {
        Self {
            secret: secret.into(),
            algorithm,
            expiry_min,
        }
    }

    pub fn from_config() -> Self {
        let security = &config::config().security;
        let algorithm = security.jwt_algorithm.parse().unwrap_or(Algorithm::HS256);
        Self::new(security.jwt_secret.clone(), algorithm, security.jwt_expiry_min)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.expiry_min)
    }

    /// Signs a claims set into a token. Signing failures surface as
    /// `AuthorizationFailed`; with an HMAC key they do not occur in practice.
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        let key = EncodingKey::from_secret(self.secret.as_bytes());

        encode(&Header::new(self.algorithm), claims, &key).map_err(|e| {
            tracing::error!(error = %e, "token signing failed");
            AuthError::AuthorizationFailed
        })
    }

    /// Verifies signature and expiry, returning the decoded claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::new(self.algorithm);

        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
                Err(AuthError::TokenExpired)
            }
            Err(_) => Err(AuthError::AuthorizationFailed),
        }
    }

    /// Builds and signs a fresh claims set for the given identity.
    pub fn issue(
        &self,
        sub: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<String, AuthError> {
        self.encode(&Claims::new(sub, email, role, self.token_ttl()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret", Algorithm::HS256, 60)
    }

    #[test]
    fn encode_decode_round_trip() {
        let tokens = service();
        let claims = Claims::new("42", "kim@example.com", "admin", Duration::minutes(60));

        let token = tokens.encode(&claims).unwrap();
        let decoded = tokens.decode(&token).unwrap();

        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.email, "kim@example.com");
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.exp, claims.exp);
    }

    #[test]
    fn expired_token_maps_to_token_expired() {
        let tokens = service();
        let claims = Claims::new("42", "kim@example.com", "admin", Duration::minutes(-120));

        let token = tokens.encode(&claims).unwrap();

        assert_eq!(tokens.decode(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn wrong_secret_maps_to_authorization_failed() {
        let claims = Claims::new("42", "kim@example.com", "admin", Duration::minutes(60));
        let token = TokenService::new("another-secret", Algorithm::HS256, 60)
            .encode(&claims)
            .unwrap();

        assert_eq!(service().decode(&token), Err(AuthError::AuthorizationFailed));
    }

    #[test]
    fn malformed_token_maps_to_authorization_failed() {
        assert_eq!(
            service().decode("definitely.not.a-token"),
            Err(AuthError::AuthorizationFailed)
        );
    }

    #[test]
    fn issued_token_carries_configured_ttl() {
        let tokens = service();
        let decoded = tokens.decode(&tokens.issue("7", "a@b.c", "user").unwrap()).unwrap();

        assert_eq!(decoded.exp - decoded.iat, 60 * 60);
    }

    #[test]
    fn extra_claims_survive_round_trip() {
        let tokens = service();
        let mut claims = Claims::new("42", "kim@example.com", "admin", Duration::minutes(60));
        claims
            .extra
            .insert("tenant".to_string(), serde_json::json!("acme"));

        let decoded = tokens.decode(&tokens.encode(&claims).unwrap()).unwrap();

        assert_eq!(decoded.extra.get("tenant"), Some(&serde_json::json!("acme")));
    }
}
