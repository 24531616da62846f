use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

use super::voter::Email;

const BEARER_PREFIX: &str = "Bearer ";

/// An authenticated voter identity.
///
/// The token only proves who the caller is; whether that voter still exists
/// and is active is checked by whatever consumes the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub email: Email,
}

impl AuthToken {
    pub fn new(email: Email) -> Self {
        Self { email }
    }

    /// Sign this token into a bearer string.
    pub fn encode(&self, config: &Config) -> Result<String> {
        let claims = Claims {
            sub: self.email.clone(),
            expire_at: Utc::now() + config.auth_ttl(),
        };
        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?)
    }

    /// Verify and decode a bearer string.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| Self::new(claims.claims.sub))?;
        Ok(token)
    }
}

/// Token claims: the voter's email plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Email,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the `Authorization: Bearer` header.
    ///
    /// Routes take `Result<AuthToken, Error>` so the failure reaches the
    /// client as a structured error.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let header = match req.headers().get_one("Authorization") {
            Some(header) => header,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthenticated("no authorization header"),
                ))
            }
        };
        let token = match header.strip_prefix(BEARER_PREFIX) {
            Some(token) if !token.trim().is_empty() => token.trim(),
            _ => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthenticated("expected a bearer token"),
                ))
            }
        };

        match Self::decode(token, config) {
            Ok(token) => Outcome::Success(token),
            Err(e) => Outcome::Failure((e.status(), e)),
        }
    }
}
