use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::SessionDuration;
use crate::services::form::{validation_errors_to_field_errors, FieldErrors, FormObject, FormValue};

pub struct Redirects {
    /// Where signed-in users land.
    pub home: &'static str,
    /// Where everyone else lands.
    pub main: &'static str,
    pub sign_in: &'static str,
}

pub const REDIRECTS: Redirects = Redirects {
    home: "/home",
    main: "/",
    sign_in: "/sign-in",
};

pub struct SignInFormErrors {
    pub email_invalid: &'static str,
    pub email_required: &'static str,
    pub mail_sending_failed: &'static str,
    pub too_many_requests: &'static str,
    pub magic_link_invalid: &'static str,
}

pub const FORM_ERRORS: SignInFormErrors = SignInFormErrors {
    email_invalid: "Email address is invalid",
    email_required: "Email address is required",
    mail_sending_failed: "There was a problem with sending you an email, try again",
    too_many_requests: "Too many magic link requests for the same email address and device",
    magic_link_invalid: "Magic link is invalid or has expired",
};

// =============================================================================
// SIGN IN
// =============================================================================

#[derive(Debug, Validate)]
pub struct SignInForm {
    #[validate(
        required(message = "Email address is required"),
        email(message = "Email address is invalid")
    )]
    pub email: Option<String>,
    pub remember_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub session_duration: SessionDuration,
}

impl SignInForm {
    /// Read the `email` and `rememberMe` fields. `rememberMe` is true whenever
    /// any non-empty value was submitted.
    pub fn from_form(form: &FormObject) -> Result<Self, FieldErrors> {
        let email = match form.get("email") {
            None => None,
            Some(FormValue::Single(email)) => Some(email.clone()),
            Some(FormValue::Multiple(_)) => {
                return Err(FieldErrors::from([(
                    "email".to_string(),
                    FORM_ERRORS.email_invalid.to_string(),
                )]));
            }
        };

        Ok(Self {
            email,
            remember_me: form.contains_key("rememberMe"),
        })
    }

    pub fn into_request(self) -> Result<SignInRequest, FieldErrors> {
        self.validate()
            .map_err(|e| validation_errors_to_field_errors(&e))?;

        let Some(email) = self.email else {
            return Err(FieldErrors::from([(
                "email".to_string(),
                FORM_ERRORS.email_required.to_string(),
            )]));
        };

        Ok(SignInRequest {
            email,
            session_duration: SessionDuration::from_remember_me(self.remember_me),
        })
    }
}

// =============================================================================
// MAGIC LINK CALLBACK
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MagicLinkQuery {
    #[serde(default)]
    pub token: String,
}

// =============================================================================
// HOME (Current User)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub session_duration: SessionDuration,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
