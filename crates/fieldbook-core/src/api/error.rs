use reqwest::header::InvalidHeaderValue;
use serde::Deserialize;
use thiserror::Error;

use crate::models::FieldError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body of the services: an envelope with a message and, for
/// validation failures, a list of field errors.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the server's message and any field errors out of an error body.
    ///
    /// Accepts `{"message": ..., "data": [{"field", "message"}]}` and the
    /// order service's bare `[{"field", "message"}]`.
    fn parse_body(body: &str) -> (Option<String>, Vec<FieldError>) {
        if let Ok(fields) = serde_json::from_str::<Vec<FieldError>>(body) {
            let message = fields.first().map(|f| f.message.clone());
            return (message, fields);
        }
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => {
                let fields = envelope
                    .data
                    .and_then(|data| serde_json::from_value::<Vec<FieldError>>(data).ok())
                    .unwrap_or_default();
                (envelope.message.filter(|m| !m.is_empty()), fields)
            }
            Err(_) => (None, Vec::new()),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let (message, fields) = Self::parse_body(body);
        let detail = message.unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            400 | 422 => ApiError::Validation {
                message: detail,
                fields,
            },
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    /// Whether the session should be dropped in response to this error.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to reach server. Check your connection.".to_string()
            }
            ApiError::Unauthorized => "Session expired. Please log in again.".to_string(),
            ApiError::RateLimited => "Server is busy. Please wait a moment and try again.".to_string(),
            ApiError::Validation { message, fields } if !fields.is_empty() => {
                let details: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        if f.field.is_empty() {
                            f.message.clone()
                        } else {
                            format!("{}: {}", f.field, f.message)
                        }
                    })
                    .collect();
                format!("{} ({})", message, details.join("; "))
            }
            other => other.to_string(),
        }
    }
}
