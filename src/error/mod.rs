//! Error types and handlers for registry operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Version selector outside of {1, 2}
    #[error("invalid API version: {0}")]
    InvalidVersion(u32),
    /// No response could be obtained (DNS, connect, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),
    /// A response was obtained but carried a non-success status
    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },
    /// Network related errors
    #[error("Network error: {0}")]
    Network(String),
    /// Registry related errors
    #[error("Registry error: {0}")]
    Registry(String),
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),
    /// File IO errors
    #[error("IO error: {0}")]
    Io(String),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RegistryError {
    /// Status code carried by the error, if it came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RegistryError::Transport(_))
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Network(err.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}

impl From<base64::DecodeError> for RegistryError {
    fn from(err: base64::DecodeError) -> Self {
        RegistryError::Parse(format!("base64 decode error: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for RegistryError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        RegistryError::Parse(format!("UTF-8 conversion error: {}", err))
    }
}
