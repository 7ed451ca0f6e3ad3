use clinic_api::{ApiError, ErrorKind, FieldErrors};
use thiserror::Error;

/// Failure of a drag or resize persistence attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Event id is not an appointment id: {0}")]
    InvalidEventId(String),

    #[error("New time range is empty or inverted")]
    InvalidRange,
}

impl MutationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::InvalidEventId(_) | Self::InvalidRange => ErrorKind::Validation,
        }
    }
}

/// Failure reported by the dialog orchestrator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialogError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Form is invalid: {0:?}")]
    Form(FieldErrors),

    #[error("Cannot {action} while dialog is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("A submission is already in progress")]
    Busy,

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Unknown patient: {0}")]
    UnknownPatient(i64),
}

impl DialogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::Form(_) | Self::UnknownPatient(_) => ErrorKind::Validation,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Failure while routing a widget callback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Dialog(#[from] DialogError),
}

impl PageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mutation(e) => e.kind(),
            Self::Dialog(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            MutationError::from(ApiError::Timeout).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            MutationError::InvalidEventId("abc".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(DialogError::Busy.kind(), ErrorKind::Unknown);
        assert_eq!(
            DialogError::from(ApiError::Conflict("taken".into())).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_transition_message() {
        let err = DialogError::InvalidTransition {
            action: "submit",
            state: "closed",
        };
        assert_eq!(err.to_string(), "Cannot submit while dialog is closed");
    }
}
