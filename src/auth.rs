pub mod password;

use anyhow::anyhow;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
    /// Issue time of the first token in a refresh chain.
    pub orig_iat: i64,
}

/// Identity extracted from a verified bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
    refresh_window: Duration,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    /// Unix timestamp after which the token can no longer be refreshed.
    pub refresh_expires_in: i64,
}

impl TokenIssuer {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry: Duration::minutes(config.jwt_expiry_minutes),
            refresh_window: Duration::days(config.jwt_refresh_expiry_days),
        }
    }

    pub fn issue(&self, user_id: i64, username: &str) -> AppResult<IssuedToken> {
        let now = Utc::now().timestamp();
        self.sign(Claims {
            user_id,
            username: username.to_string(),
            exp: now + self.expiry.num_seconds(),
            iat: now,
            orig_iat: now,
        })
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthenticated(anyhow!("Invalid token: {}", e)))
    }

    /// Re-signs a still valid token with a fresh expiry, as long as the
    /// refresh window counted from `orig_iat` is open.
    pub fn refresh(&self, token: &str) -> AppResult<IssuedToken> {
        let claims = self.verify(token)?;
        let now = Utc::now().timestamp();
        if now > claims.orig_iat + self.refresh_window.num_seconds() {
            return Err(AppError::Unauthenticated(anyhow!("Refresh has expired")));
        }
        self.sign(Claims {
            exp: now + self.expiry.num_seconds(),
            iat: now,
            ..claims
        })
    }

    fn sign(&self, claims: Claims) -> AppResult<IssuedToken> {
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(anyhow!("JWT generation error: {}", e)))?;
        let refresh_expires_in = claims.orig_iat + self.refresh_window.num_seconds();
        Ok(IssuedToken {
            token,
            claims,
            refresh_expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AppConfig::development().security)
    }

    #[test]
    fn issued_tokens_verify() {
        let issuer = issuer();
        let issued = issuer.issue(7, "alice").unwrap();
        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.orig_iat, claims.iat);
        assert_eq!(AuthUser::from(claims).user_id, 7);
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let mut other = AppConfig::development().security;
        other.jwt_secret = "another-secret".to_string();
        let token = TokenIssuer::new(&other).issue(1, "mallory").unwrap().token;

        let err = issuer().verify(&token).unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let stale = issuer
            .sign(Claims {
                user_id: 1,
                username: "alice".to_string(),
                exp: now - 3600,
                iat: now - 7200,
                orig_iat: now - 7200,
            })
            .unwrap();
        assert!(issuer.verify(&stale.token).is_err());
        assert!(issuer.refresh(&stale.token).is_err());
    }

    #[test]
    fn refresh_keeps_the_original_issue_time() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let first = issuer
            .sign(Claims {
                user_id: 3,
                username: "bob".to_string(),
                exp: now + 60,
                iat: now - 600,
                orig_iat: now - 600,
            })
            .unwrap();

        let refreshed = issuer.refresh(&first.token).unwrap();
        assert_eq!(refreshed.claims.orig_iat, now - 600);
        assert!(refreshed.claims.exp > first.claims.exp);
        assert_eq!(refreshed.refresh_expires_in, first.refresh_expires_in);
    }

    #[test]
    fn refresh_window_is_enforced() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let ancient = issuer
            .sign(Claims {
                user_id: 3,
                username: "bob".to_string(),
                exp: now + 60,
                iat: now - 60,
                orig_iat: now - Duration::days(30).num_seconds(),
            })
            .unwrap();
        let err = issuer.refresh(&ancient.token).unwrap_err();
        assert_eq!(err.to_string(), "Refresh has expired");
    }

    #[test]
    fn token_payload_carries_the_user_id_claim() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let issued = issuer().issue(11, "carol").unwrap();
        let payload = issued.token.split('.').nth(1).unwrap();
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(claims["user_id"], 11);
        assert_eq!(claims["username"], "carol");
        assert_eq!(claims["orig_iat"], claims["iat"]);
        assert!(claims.get("sub").is_none());
    }
}
