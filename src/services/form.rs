use axum::{
    extract::{FromRequest, Multipart, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use validator::ValidationErrors;

/// Field name -> single human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Submitted form fields, after empty values were dropped.
pub type FormObject = BTreeMap<String, FormValue>;

/// Key used for errors that don't belong to a single field.
pub const OTHER_FIELD: &str = "other";

pub struct CommonFormErrors {
    pub bad_request: &'static str,
    pub form_data_invalid: &'static str,
    pub internal_server_error: &'static str,
}

pub const COMMON_FORM_ERRORS: CommonFormErrors = CommonFormErrors {
    bad_request: "Incorrect request data",
    form_data_invalid: "Make sure you're properly submitting form and try again",
    internal_server_error: "Internal server error, try again",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FormValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FormValue::Single(value) => Some(value),
            FormValue::Multiple(_) => None,
        }
    }
}

/// Collapse ordered form pairs into one entry per field. Repeated keys keep
/// every value in encounter order; empty strings count as absent.
pub fn convert_form_data_into_object<I>(pairs: I) -> FormObject
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .fold(FormObject::new(), |mut result, (key, value)| {
            match result.remove(&key) {
                None => {
                    result.insert(key, FormValue::Single(value));
                }
                Some(FormValue::Single(first)) => {
                    result.insert(key, FormValue::Multiple(vec![first, value]));
                }
                Some(FormValue::Multiple(mut values)) => {
                    values.push(value);
                    result.insert(key, FormValue::Multiple(values));
                }
            }
            result
        })
}

/// First message of every failing field. Struct-level failures are reported
/// under `other` with a generic message.
pub fn validation_errors_to_field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut field_errors = FieldErrors::new();

    for (field, errors) in errors.field_errors() {
        let Some(first) = errors.first() else {
            continue;
        };

        if field == "__all__" {
            field_errors.insert(
                OTHER_FIELD.to_string(),
                COMMON_FORM_ERRORS.form_data_invalid.to_string(),
            );
            continue;
        }

        let message = first
            .message
            .as_ref()
            .map(|message| message.to_string())
            .unwrap_or_else(|| first.code.to_string());

        field_errors.insert(field.to_string(), message);
    }

    field_errors
}

// =============================================================================
// ACTION ERRORS
// =============================================================================

/// Failure of a form action, as seen by the client.
#[derive(Debug, Clone)]
pub enum ActionError {
    /// Rejected input; `field_errors` may be empty for form-level problems.
    Form {
        status: StatusCode,
        message: String,
        field_errors: FieldErrors,
    },
    /// Failure the user is told about, but can't fix by editing the form.
    Server { status: StatusCode, message: String },
    Unexpected,
}

impl ActionError {
    pub fn form(message: impl Into<String>) -> Self {
        Self::Form {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            field_errors: FieldErrors::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Form { status, .. } | Self::Server { status, .. } => *status,
            Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Form { message, .. } | Self::Server { message, .. } => message,
            Self::Unexpected => COMMON_FORM_ERRORS.internal_server_error,
        }
    }
}

/// Errors to show next to form fields for the last action result.
pub fn create_form_fields_errors(error: Option<&ActionError>) -> FieldErrors {
    let Some(error) = error else {
        return FieldErrors::new();
    };

    match error {
        ActionError::Form { field_errors, message, .. } if field_errors.is_empty() => {
            FieldErrors::from([(OTHER_FIELD.to_string(), message.clone())])
        }
        ActionError::Form { field_errors, .. } => field_errors.clone(),
        ActionError::Server { message, .. } => {
            FieldErrors::from([(OTHER_FIELD.to_string(), message.clone())])
        }
        ActionError::Unexpected => FieldErrors::from([(
            OTHER_FIELD.to_string(),
            COMMON_FORM_ERRORS.internal_server_error.to_string(),
        )]),
    }
}

#[derive(Debug, Serialize)]
pub struct ActionErrorResponse {
    pub error: String,
    pub field_errors: FieldErrors,
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let body = ActionErrorResponse {
            error: self.message().to_string(),
            field_errors: create_form_fields_errors(Some(&self)),
        };

        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Ordered key/value pairs from a url-encoded or multipart form body.
#[derive(Debug, Default)]
pub struct FormPairs(pub Vec<(String, String)>);

impl<S> FromRequest<S> for FormPairs
where
    S: Send + Sync,
{
    type Rejection = ActionError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| {
                    tracing::debug!("Rejected url-encoded form: {}", e);
                    ActionError::form(COMMON_FORM_ERRORS.form_data_invalid)
                })?;
            return Ok(Self(pairs));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|_| ActionError::form(COMMON_FORM_ERRORS.form_data_invalid))?;

        let mut pairs = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ActionError::form(COMMON_FORM_ERRORS.form_data_invalid))?
        {
            // File uploads are not part of any form here
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|_| ActionError::form(COMMON_FORM_ERRORS.form_data_invalid))?;
            pairs.push((name, value));
        }

        Ok(Self(pairs))
    }
}
