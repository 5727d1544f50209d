use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::model::{MagicLink, MagicLinkFilter, User};
use super::schema::FORM_ERRORS;
use crate::services::form::{ActionError, FieldErrors, COMMON_FORM_ERRORS};

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

pub type Result<T> = std::result::Result<T, AuthError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create the user if the email is new, otherwise return the existing one untouched.
    async fn upsert(&self, email: &str) -> Result<User>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait MagicLinkRepository: Send + Sync {
    /// Link with the latest `valid_until` among those matching `filter`.
    async fn find_first(&self, filter: &MagicLinkFilter) -> Result<Option<MagicLink>>;
    async fn create(&self, magic_link: &MagicLink) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{}", COMMON_FORM_ERRORS.bad_request)]
    Validation(FieldErrors),

    #[error("{}", COMMON_FORM_ERRORS.form_data_invalid)]
    FormDataInvalid,

    #[error("{}", FORM_ERRORS.too_many_requests)]
    TooManyRequests,

    #[error("{}", FORM_ERRORS.mail_sending_failed)]
    MailSendingFailed,

    #[error("{}", FORM_ERRORS.magic_link_invalid)]
    InvalidMagicLink,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::FormDataInvalid => StatusCode::BAD_REQUEST,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::MailSendingFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidMagicLink => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ActionError {
    fn from(error: AuthError) -> Self {
        let status = error.status_code();
        match error {
            AuthError::Validation(field_errors) => ActionError::Form {
                status,
                message: COMMON_FORM_ERRORS.bad_request.to_string(),
                field_errors,
            },
            AuthError::FormDataInvalid | AuthError::TooManyRequests | AuthError::InvalidMagicLink => {
                ActionError::Form {
                    status,
                    message: error.to_string(),
                    field_errors: FieldErrors::new(),
                }
            }
            AuthError::MailSendingFailed => ActionError::Server {
                status,
                message: error.to_string(),
            },
            AuthError::Database(_) | AuthError::Token(_) | AuthError::Internal(_) => {
                tracing::error!("Unhandled auth failure: {}", error);
                ActionError::Unexpected
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ActionError::from(self).into_response()
    }
}
