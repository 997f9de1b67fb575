//! Common error types for MyPokedex

use thiserror::Error;

/// Common result type for MyPokedex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the MyPokedex crates
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure before a response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Backend rejected the session or the credentials (401/403)
    #[error("Unauthorized")]
    Unauthorized,

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Map an HTTP status code to the matching error variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Error::Unauthorized,
            404 => Error::NotFound(message.into()),
            _ => Error::Api {
                status,
                message: message.into(),
            },
        }
    }

    /// Text safe to show to the trainer.
    ///
    /// Login and registration failures are never detailed (no hint whether the
    /// email exists or the server is down).
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Network(_) => "The Pokedex server could not be reached. Please try again later.",
            Error::Unauthorized => "Authentication failed. Check your credentials and log in again.",
            Error::NotFound(_) => "The requested Pokémon could not be found.",
            Error::InvalidInput(_) => "The request was invalid.",
            Error::Config(_) => "The client configuration is invalid.",
            _ => "Something went wrong. Please try again.",
        }
    }

    /// True for errors that mean the session is gone
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(Error::from_status(401, ""), Error::Unauthorized));
        assert!(matches!(Error::from_status(403, ""), Error::Unauthorized));
        assert!(matches!(Error::from_status(404, "pokemon 9"), Error::NotFound(m) if m == "pokemon 9"));
        assert!(matches!(
            Error::from_status(500, "boom"),
            Error::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_user_message_is_generic() {
        let err = Error::Api {
            status: 400,
            message: "email already used by trainer 12".to_string(),
        };
        assert!(!err.user_message().contains("trainer 12"));
    }
}
