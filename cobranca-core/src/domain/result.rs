//! Result and error types for the core library

use thiserror::Error;

/// Domain failures the CLI reports by kind
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status change: {0}")]
    InvalidTransition(String),
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid transition error
    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::not_found("invoice 42").to_string(),
            "Not found: invoice 42"
        );
        assert!(Error::validation("bad input")
            .to_string()
            .contains("Validation error"));
    }

    #[test]
    fn test_error_survives_anyhow() {
        let err: anyhow::Error = Error::invalid_transition("RECEIVED -> OPEN").into();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidTransition(_))
        ));
    }
}
