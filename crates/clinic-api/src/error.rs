//! Appointment API error types.

use std::collections::BTreeMap;

use clinic_core::{AppError, NetworkError};
use thiserror::Error;

/// Coarse failure classes reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request never reached the server or never returned.
    Network,
    /// 400/422, or any other 4xx that names offending fields.
    Validation,
    /// Server reported a conflicting change.
    Conflict,
    Unknown,
}

/// Field name -> messages, as returned by the backend.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Validation failed ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        fields: FieldErrors,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Timeout => ErrorKind::Network,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Status { .. } | Self::Decode(_) => ErrorKind::Unknown,
        }
    }

    /// Whether a read may be retried. Mutations never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// Field-level messages, empty unless this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        AppError::from(self.clone()).user_message()
    }

    /// Build an error from a non-success status and its body text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();

        if status == 409 {
            let message = parsed
                .as_ref()
                .and_then(summary_message)
                .unwrap_or_else(|| body.to_string());
            return Self::Conflict(message);
        }

        if (400..500).contains(&status) && !matches!(status, 408 | 429) {
            if let Some(value) = parsed.as_ref().filter(|v| v.is_object()) {
                let fields = extract_field_errors(value);
                // 401/403/404 carry a bare `detail`; only field errors make them a rejection.
                if !matches!(status, 400 | 422) && fields.is_empty() {
                    let message = summary_message(value).unwrap_or_else(|| body.to_string());
                    return Self::Status { status, message };
                }
                let message = summary_message(value).unwrap_or_else(|| {
                    fields
                        .values()
                        .flatten()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                });
                return Self::Validation {
                    status,
                    message,
                    fields,
                };
            }
        }

        let message = parsed
            .as_ref()
            .and_then(summary_message)
            .unwrap_or_else(|| body.to_string());
        Self::Status { status, message }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Network(s) => AppError::Network(NetworkError::Unreachable(s)),
            ApiError::Timeout => AppError::Network(NetworkError::TimedOut),
            ApiError::Validation { message, .. } => AppError::Validation(message),
            ApiError::Conflict(s) => AppError::Conflict(s),
            ApiError::Status { status, message } => {
                AppError::Network(NetworkError::Status { status, message })
            }
            ApiError::Decode(s) => AppError::Network(NetworkError::Malformed(s)),
        }
    }
}

/// Top-level message keys used by the backend.
fn summary_message(value: &serde_json::Value) -> Option<String> {
    for key in ["detail", "error", "message"] {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            return Some(s.to_string());
        }
    }
    value
        .get("non_field_errors")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
}

fn extract_field_errors(value: &serde_json::Value) -> FieldErrors {
    let mut fields = FieldErrors::new();
    let Some(obj) = value.as_object() else {
        return fields;
    };

    for (field, messages) in obj {
        if matches!(field.as_str(), "detail" | "error" | "message" | "non_field_errors") {
            continue;
        }
        let collected: Vec<String> = match messages {
            serde_json::Value::String(s) => vec![s.clone()],
            serde_json::Value::Array(arr) => arr
                .iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect(),
            _ => continue,
        };
        if !collected.is_empty() {
            fields.insert(field.clone(), collected);
        }
    }
    fields
}
