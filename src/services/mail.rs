use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers sign-in emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_magic_link(&self, token: &str, email: &str) -> Result<(), MailError>;
}

/// Address the user has to open to finish signing in.
pub fn magic_link_url(app_url: &str, token: &str) -> String {
    format!("{}/magic-link?token={}", app_url.trim_end_matches('/'), token)
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: EmailAddress<'a>,
    to: Vec<EmailAddress<'a>>,
    subject: &'a str,
    html_content: String,
    text_content: String,
}

/// Sends transactional email through a Brevo-compatible HTTP API.
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
    app_url: String,
}

impl HttpMailer {
    pub fn new(config: MailConfig, app_url: String) -> Result<Self, MailError> {
        Self::with_timeout(config, app_url, SEND_TIMEOUT)
    }

    /// Fails when the HTTP client can't be built.
    pub fn with_timeout(config: MailConfig, app_url: String, timeout: Duration) -> Result<Self, MailError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            config,
            app_url,
        })
    }

    fn body<'a>(&'a self, link: &str, email: &'a str) -> SendEmailBody<'a> {
        SendEmailBody {
            sender: EmailAddress {
                email: &self.config.sender_email,
                name: Some(&self.config.sender_name),
            },
            to: vec![EmailAddress { email, name: None }],
            subject: "Your Planotes sign-in link",
            html_content: format!(
                "<p>Click the link below to sign in to Planotes on the device you requested it from.</p>\
                 <p><a href=\"{link}\">Sign in</a></p>\
                 <p>The link expires in a few minutes. If you didn't request it, ignore this email.</p>"
            ),
            text_content: format!("Sign in to Planotes: {link}"),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_magic_link(&self, token: &str, email: &str) -> Result<(), MailError> {
        let link = magic_link_url(&self.app_url, token);

        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&self.body(&link, email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Magic link email accepted for delivery");
        Ok(())
    }
}

/// Development mailer: writes the link to the log instead of sending it.
pub struct LogMailer {
    app_url: String,
}

impl LogMailer {
    pub fn new(app_url: String) -> Self {
        Self { app_url }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_magic_link(&self, token: &str, email: &str) -> Result<(), MailError> {
        tracing::info!(
            "Mail API not configured, magic link for {}: {}",
            email,
            magic_link_url(&self.app_url, token)
        );
        Ok(())
    }
}
