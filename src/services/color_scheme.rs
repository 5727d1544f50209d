use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

use crate::services::cookie::{read_cookie, Cookie, SameSite};

pub const COLOR_SCHEME_COOKIE: &str = "csch";
const ONE_YEAR_IN_SECONDS: u64 = 31_556_926;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorScheme {
    Dark,
    Light,
    #[default]
    System,
}

impl ColorScheme {
    /// DARK -> LIGHT -> SYSTEM -> DARK
    pub fn next(self) -> Self {
        match self {
            ColorScheme::Dark => ColorScheme::Light,
            ColorScheme::Light => ColorScheme::System,
            ColorScheme::System => ColorScheme::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorScheme::Dark => "DARK",
            ColorScheme::Light => "LIGHT",
            ColorScheme::System => "SYSTEM",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown color scheme: {0}")]
pub struct UnknownColorScheme(pub String);

impl FromStr for ColorScheme {
    type Err = UnknownColorScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DARK" => Ok(ColorScheme::Dark),
            "LIGHT" => Ok(ColorScheme::Light),
            "SYSTEM" => Ok(ColorScheme::System),
            other => Err(UnknownColorScheme(other.to_string())),
        }
    }
}

/// Preference stored in the `csch` cookie, `SYSTEM` when missing or garbled.
pub fn get_color_scheme(headers: &HeaderMap) -> ColorScheme {
    read_cookie(headers, COLOR_SCHEME_COOKIE)
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

pub fn get_next_color_scheme(current: ColorScheme) -> ColorScheme {
    current.next()
}

pub fn create_color_scheme_cookie(preferred: ColorScheme) -> String {
    Cookie::private(COLOR_SCHEME_COOKIE, preferred.as_str(), SameSite::Strict)
        .max_age(Duration::from_secs(ONE_YEAR_IN_SECONDS))
        .to_header_value()
}
