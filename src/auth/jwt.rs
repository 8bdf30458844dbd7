use anyhow::{bail, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,        // Subject (user id as string)
    pub user_id: i32,       // User primary key
    pub token_type: String, // "access" or "refresh"
    pub exp: i64,           // Expiration timestamp
    pub iat: i64,           // Issued at timestamp
    pub jti: String,        // JWT ID (unique token identifier)
}

/// The access/refresh pair handed back by every auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: chrono::Duration::minutes(access_ttl_minutes),
            refresh_ttl: chrono::Duration::days(refresh_ttl_days),
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            &config.secret,
            config.access_ttl_minutes,
            config.refresh_ttl_days,
        )
    }

    fn create_token(
        &self,
        user_id: i32,
        token_type: &str,
        ttl: chrono::Duration,
    ) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            token_type: token_type.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(), // Unique token ID
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Create a fresh access/refresh pair for a user
    pub fn token_pair(&self, user_id: i32) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.create_token(user_id, TOKEN_TYPE_ACCESS, self.access_ttl)?,
            refresh: self.create_token(user_id, TOKEN_TYPE_REFRESH, self.refresh_ttl)?,
        })
    }

    /// Verify and decode a JWT token of any type
    ///
    /// Returns claims if token is valid and not expired
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::default();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }

    /// Verify a token presented as request authentication
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        let claims = self.verify(token)?;
        if claims.token_type != TOKEN_TYPE_ACCESS {
            bail!("not an access token");
        }
        Ok(claims)
    }

    /// Verify a token presented to the refresh endpoint
    pub fn verify_refresh(&self, token: &str) -> Result<Claims> {
        let claims = self.verify(token)?;
        if claims.token_type != TOKEN_TYPE_REFRESH {
            bail!("not a refresh token");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test_secret_key", 30, 7)
    }

    #[test]
    fn test_create_and_verify_pair() {
        let service = service();
        let pair = service.token_pair(42).unwrap();

        let access = service.verify_access(&pair.access).unwrap();
        assert_eq!(access.user_id, 42);
        assert_eq!(access.sub, "42");
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);

        let refresh = service.verify_refresh(&pair.refresh).unwrap();
        assert_eq!(refresh.user_id, 42);
        assert_eq!(refresh.token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn test_invalid_token() {
        let service = service();
        assert!(service.verify("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", 30, 7);
        let service2 = JwtService::new("secret2", 30, 7);

        let pair = service1.token_pair(7).unwrap();

        // Token created with secret1 should not verify with secret2
        assert!(service2.verify(&pair.access).is_err());
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let service = service();
        let pair = service.token_pair(7).unwrap();

        assert!(service.verify_access(&pair.refresh).is_err());
        assert!(service.verify_refresh(&pair.access).is_err());
    }

    #[test]
    fn test_expiry_windows() {
        let service = service();
        let pair = service.token_pair(7).unwrap();

        let now = chrono::Utc::now().timestamp();
        let access = service.verify(&pair.access).unwrap();
        let refresh = service.verify(&pair.refresh).unwrap();

        let access_expires_in = access.exp - now;
        assert!(access_expires_in > 29 * 60);
        assert!(access_expires_in <= 30 * 60);

        let refresh_expires_in = refresh.exp - now;
        assert!(refresh_expires_in > 6 * 24 * 3600);
        assert!(refresh_expires_in <= 7 * 24 * 3600);
    }

    #[test]
    fn test_tokens_carry_unique_ids() {
        let service = service();
        let pair = service.token_pair(7).unwrap();
        let a = service.verify(&pair.access).unwrap();
        let r = service.verify(&pair.refresh).unwrap();
        assert_ne!(a.jti, r.jti);
    }
}
