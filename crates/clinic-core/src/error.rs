//! Error classes shared by every dashboard layer.
//!
//! Each variant maps to one message the front desk sees in a toast or in
//! place of the calendar. The `Display` text keeps the technical detail for
//! the logs.

use thiserror::Error;

/// A failure as the dashboard reports it.
///
/// `clinic-api` folds its transport errors into this type; callers pick the
/// toast text with [`AppError::user_message`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// 400/422 from the backend.
    #[error("rejected by server: {0}")]
    Validation(String),

    /// 409 from the backend.
    #[error("conflicting change: {0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Validation(_) => "The clinic server rejected some fields. Check the form.",
            AppError::Conflict(_) => {
                "Someone else changed this appointment. Refresh the calendar and retry."
            }
            AppError::Other(_) => "Something unexpected happened. Retry in a moment.",
        }
    }
}

/// Transport level failures talking to the clinic backend.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("no response within the request timeout")]
    TimedOut,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Unreachable(_) => {
                "Could not reach the clinic server. Check the network and retry."
            }
            NetworkError::TimedOut => "The clinic server timed out. Retry in a moment.",
            NetworkError::Status { status, .. } if *status >= 500 => {
                "The clinic server hit an internal problem. Retry later."
            }
            NetworkError::Status { .. } => "The clinic server refused the request.",
            NetworkError::Malformed(_) => "The clinic server sent data the dashboard cannot read.",
        }
    }
}

/// Problems with `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("cannot parse config.toml: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Dashboard settings are out of range. Fix config.toml.",
            ConfigError::ParseError(_) => "config.toml is not valid TOML.",
        }
    }
}
