//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use domains::{Actor, DomainError, DomainResult, IssuedToken, TokenService};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    username: String,
    staff: bool,
    iat: i64,
    exp: i64,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, actor: &Actor) -> DomainResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: actor.user_id,
            username: actor.username.clone(),
            staff: actor.is_staff,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))?;
        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_at,
        })
    }

    fn verify(&self, token: &str) -> DomainResult<Actor> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "rejected bearer token");
            DomainError::Unauthenticated
        })?;
        Ok(Actor {
            user_id: data.claims.sub,
            username: data.claims.username,
            is_staff: data.claims.staff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: "fern".into(),
            is_staff: true,
        }
    }

    #[test]
    fn issued_token_verifies_to_the_same_actor() {
        let svc = JwtTokenService::new(b"test-secret", Duration::hours(1));
        let who = actor();
        let token = svc.issue(&who).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(svc.verify(&token.access_token).unwrap(), who);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = JwtTokenService::new(b"secret-a", Duration::hours(1));
        let verifier = JwtTokenService::new(b"secret-b", Duration::hours(1));
        let token = issuer.issue(&actor()).unwrap();
        assert_eq!(
            verifier.verify(&token.access_token).unwrap_err(),
            DomainError::Unauthenticated
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = JwtTokenService::new(b"test-secret", Duration::seconds(-10));
        let token = svc.issue(&actor()).unwrap();
        assert_eq!(
            svc.verify(&token.access_token).unwrap_err(),
            DomainError::Unauthenticated
        );
    }

    #[test]
    fn garbage_is_rejected() {
        let svc = JwtTokenService::new(b"test-secret", Duration::hours(1));
        assert!(svc.verify("not.a.jwt").is_err());
    }
}
