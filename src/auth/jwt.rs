use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::model::{User, UserParam};

/// Signed claim set: the user id and an absolute expiry. Tokens are never
/// stored or revoked; expiry is the only termination mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Process-wide signing material, built once from config and never rotated
/// mid-process.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig { secret, ttl_hours } = state.config.jwt.clone();
        Self::new(&secret, TimeDuration::hours(ttl_hours))
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: TimeDuration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            warn!(error = %e, "jwt encode error");
            AppError::SigningFailed
        })?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// An expired-but-well-signed token and a malformed or tampered token
    /// are distinguishable error kinds; both end the request.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenInvalid,
            }
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Resolves the bearer token to a full user record. Propagates `NotFound`
/// when the account behind a structurally valid token no longer exists.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenInvalid)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AppError::TokenInvalid)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            e
        })?;

        let user = state.users.find_one(&UserParam::by_id(claims.sub)).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("dev-secret", TimeDuration::hours(1))
    }

    #[test]
    fn sign_then_verify_returns_the_user_id() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn elapsed_lifetime_yields_token_expired() {
        let expired = JwtKeys::new("dev-secret", TimeDuration::hours(-1));
        let token = expired.sign(Uuid::new_v4()).expect("sign");
        let err = keys().verify(&token).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn tampered_signature_yields_token_invalid() {
        let keys = keys();
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        let dot = token.rfind('.').expect("jwt has a signature segment");
        let mut tampered: Vec<u8> = token.into_bytes();
        tampered[dot + 1] = if tampered[dot + 1] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        let err = keys.verify(&tampered).unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }

    #[test]
    fn wrong_secret_yields_token_invalid() {
        let token = keys().sign(Uuid::new_v4()).expect("sign");
        let other = JwtKeys::new("another-secret", TimeDuration::hours(1));
        let err = other.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }

    #[test]
    fn garbage_token_yields_token_invalid() {
        let err = keys().verify("not-a-jwt").unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }
}
