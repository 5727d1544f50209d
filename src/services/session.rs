use axum::http::HeaderMap;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use rand::{rngs::OsRng, TryRngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::auth::model::SessionDuration;
use crate::services::cookie::{read_cookie, Cookie, SameSite};

pub const MAGIC_LINK_VALIDITY_IN_MINUTES: i64 = 15;
pub const MAGIC_LINK_REQUIRED_GENERATION_DELAY_IN_MINUTES: i64 = 5;

pub const MAGIC_IDENTIFIER_COOKIE: &str = "mid";
pub const SESSION_COOKIE: &str = "sid";

const MAGIC_TOKEN_BYTES: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
pub struct MagicIdentifierClaims {
    pub sub: String,        // magic link id
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,        // user id
    pub sd: SessionDuration,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Signs and reads the cookies that carry sign-in state.
pub struct SessionService {
    secret: String,
    magic_identifier_duration: Duration,
    ephemeral_session_duration: Duration,
    persistent_session_duration: Duration,
}

impl SessionService {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            magic_identifier_duration: Duration::minutes(MAGIC_LINK_VALIDITY_IN_MINUTES),
            ephemeral_session_duration: Duration::hours(12),
            persistent_session_duration: Duration::days(30),
        }
    }

    /// Bind `magic_link_id` to this device. The cookie lives as long as the link.
    pub fn create_magic_identifier_cookie(
        &self,
        magic_link_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = MagicIdentifierClaims {
            sub: magic_link_id.to_string(),
            exp: (now + self.magic_identifier_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = self.sign(&claims)?;

        Ok(Cookie::private(MAGIC_IDENTIFIER_COOKIE, token, SameSite::Lax)
            .max_age(to_std(self.magic_identifier_duration))
            .to_header_value())
    }

    /// Magic link id bound to this device, if the cookie is present and genuine.
    pub fn get_magic_identifier(&self, headers: &HeaderMap) -> Option<String> {
        let token = read_cookie(headers, MAGIC_IDENTIFIER_COOKIE)?;

        self.verify::<MagicIdentifierClaims>(&token)
            .map(|data| data.claims.sub)
            .map_err(|e| tracing::debug!("Rejected magic identifier cookie: {}", e))
            .ok()
    }

    pub fn clear_magic_identifier_cookie(&self) -> String {
        Cookie::removal(MAGIC_IDENTIFIER_COOKIE, SameSite::Lax).to_header_value()
    }

    pub fn create_session_cookie(
        &self,
        user_id: &str,
        session_duration: SessionDuration,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let lifetime = match session_duration {
            SessionDuration::Ephemeral => self.ephemeral_session_duration,
            SessionDuration::Persistent => self.persistent_session_duration,
        };

        let claims = SessionClaims {
            sub: user_id.to_string(),
            sd: session_duration,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let cookie = Cookie::private(SESSION_COOKIE, self.sign(&claims)?, SameSite::Lax);

        // Ephemeral sessions end with the browser session.
        let cookie = match session_duration {
            SessionDuration::Ephemeral => cookie,
            SessionDuration::Persistent => cookie.max_age(to_std(lifetime)),
        };

        Ok(cookie.to_header_value())
    }

    pub fn current_session(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let token = read_cookie(headers, SESSION_COOKIE)?;

        self.verify::<SessionClaims>(&token)
            .map(|data| data.claims)
            .map_err(|e| tracing::debug!("Rejected session cookie: {}", e))
            .ok()
    }

    pub fn is_signed_in(&self, headers: &HeaderMap) -> bool {
        self.current_session(headers).is_some()
    }

    pub fn clear_session_cookie(&self) -> String {
        Cookie::removal(SESSION_COOKIE, SameSite::Lax).to_header_value()
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    fn verify<T: for<'de> Deserialize<'de>>(&self, token: &str) -> Result<TokenData<T>, jsonwebtoken::errors::Error> {
        decode::<T>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
    }
}

/// 32 bytes from the OS CSPRNG, base64url without padding.
pub fn generate_magic_token() -> Result<String, String> {
    let mut bytes = [0u8; MAGIC_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| format!("OS random number generator failed: {}", e))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn to_std(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or_default()
}
