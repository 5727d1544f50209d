use std::env;

use crate::services::mail::MailConfig;
use crate::services::rate_limit::RateLimitConfig;

const DEFAULT_MAIL_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub app_url: String,
    pub bind_addr: String,
    pub run_migrations: bool,
    pub rate_limit: RateLimitConfig,
    /// `None` when no mail API is configured; links are logged instead.
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| "SESSION_SECRET must be set".to_string())?;

        if session_secret.len() < 32 {
            return Err("SESSION_SECRET must be at least 32 characters".to_string());
        }

        let app_url = env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let run_migrations = parse_bool(env::var("RUN_MIGRATIONS").ok().as_deref(), true)?;

        let rate_limit = RateLimitConfig {
            burst: parse_number("RATE_LIMIT_BURST", RateLimitConfig::default().burst)?,
            per_minute: parse_number("RATE_LIMIT_PER_MINUTE", RateLimitConfig::default().per_minute)?,
        };

        let mail = match (non_empty_var("MAIL_API_KEY"), non_empty_var("MAIL_SENDER_EMAIL")) {
            (Some(api_key), Some(sender_email)) => Some(MailConfig {
                api_url: non_empty_var("MAIL_API_URL").unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
                api_key,
                sender_email,
                sender_name: non_empty_var("MAIL_SENDER_NAME").unwrap_or_else(|| "Planotes".to_string()),
            }),
            (None, None) => None,
            _ => return Err("MAIL_API_KEY and MAIL_SENDER_EMAIL must be set together".to_string()),
        };

        Ok(Self {
            database_url,
            session_secret,
            app_url,
            bind_addr,
            run_migrations,
            rate_limit,
            mail,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number(key: &str, default: u32) -> Result<u32, String> {
    match non_empty_var(key) {
        Some(value) => value
            .parse()
            .map_err(|_| format!("{} must be a positive integer", key)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> Result<bool, String> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid boolean value: {}", v)),
        },
    }
}
