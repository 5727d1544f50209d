use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// How long the session started from a magic link lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionDuration {
    Ephemeral,
    Persistent,
}

impl SessionDuration {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            SessionDuration::Persistent
        } else {
            SessionDuration::Ephemeral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionDuration::Ephemeral => "EPHEMERAL",
            SessionDuration::Persistent => "PERSISTENT",
        }
    }
}

impl fmt::Display for SessionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown session duration: {0}")]
pub struct UnknownSessionDuration(pub String);

impl FromStr for SessionDuration {
    type Err = UnknownSessionDuration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EPHEMERAL" => Ok(SessionDuration::Ephemeral),
            "PERSISTENT" => Ok(SessionDuration::Persistent),
            other => Err(UnknownSessionDuration(other.to_string())),
        }
    }
}

impl TryFrom<String> for SessionDuration {
    type Error = UnknownSessionDuration;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MagicLink {
    pub id: String,
    pub user_id: String,
    pub token: String,
    #[sqlx(try_from = "String")]
    pub session_duration: SessionDuration,
    /// Unix timestamp (seconds).
    pub valid_until: i64,
    pub created_at: DateTime<Utc>,
}

/// Conditions for `MagicLinkRepository::find_first`. Unset fields match anything.
#[derive(Debug, Clone, Default)]
pub struct MagicLinkFilter {
    pub user_id: Option<String>,
    pub token: Option<String>,
    /// Unix timestamp (seconds), inclusive.
    pub valid_until_gte: Option<i64>,
}

impl MagicLinkFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn for_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn valid_until_gte(mut self, timestamp: i64) -> Self {
        self.valid_until_gte = Some(timestamp);
        self
    }

    pub fn matches(&self, link: &MagicLink) -> bool {
        self.user_id.as_ref().map_or(true, |user_id| *user_id == link.user_id)
            && self.token.as_ref().map_or(true, |token| *token == link.token)
            && self.valid_until_gte.map_or(true, |timestamp| link.valid_until >= timestamp)
    }
}
