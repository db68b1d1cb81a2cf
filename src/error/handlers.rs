//! Standardized error handling patterns shared by the protocol clients

use crate::error::{RegistryError, Result};
use reqwest::StatusCode;

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle authentication-related HTTP errors
    pub fn handle_auth_error(status: StatusCode, error_text: &str) -> RegistryError {
        let error_msg = match status.as_u16() {
            400 => "Invalid token request parameters".to_string(),
            401 => "Invalid credentials provided".to_string(),
            403 => "Access denied - insufficient permissions".to_string(),
            404 => "Authentication endpoint not found".to_string(),
            _ => format!("Authentication failed (status {}): {}", status, error_text),
        };

        RegistryError::Auth(error_msg)
    }

    /// Handle registry-related HTTP errors, keeping the status code
    pub fn handle_registry_error(
        status: StatusCode,
        error_text: &str,
        operation: &str,
    ) -> RegistryError {
        let message = match status.as_u16() {
            401 => format!(
                "Unauthorized to perform {} operation: {}",
                operation, error_text
            ),
            403 => format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, error_text
            ),
            404 => format!("Resource not found for {}: {}", operation, error_text),
            429 => format!("Rate limited during {}: {}", operation, error_text),
            500 => format!("Registry server error during {}: {}", operation, error_text),
            502 | 503 => format!("Registry unavailable for {}: {}", operation, error_text),
            _ => format!("{} failed (status {}): {}", operation, status, error_text),
        };

        RegistryError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Format a failure where no response was obtained at all
    pub fn handle_transport_error(error: &reqwest::Error, context: &str) -> RegistryError {
        let message = if error.is_timeout() {
            format!("{} timed out: {}", context, error)
        } else if error.is_connect() {
            format!("Connection error during {}: {}", context, error)
        } else if error.to_string().contains("dns") {
            format!("DNS resolution error for {}: {}", context, error)
        } else if error.to_string().contains("certificate") {
            format!("TLS certificate error during {}: {}", context, error)
        } else {
            format!("{} network error: {}", context, error)
        };

        RegistryError::Transport(message)
    }
}

/// Validation error utilities
pub struct ValidationErrorHandler;

impl ValidationErrorHandler {
    /// Standard credential validation
    pub fn validate_credentials(
        username: &Option<String>,
        password: &Option<String>,
    ) -> Result<()> {
        match (username, password) {
            (Some(_), None) => Err(RegistryError::Validation(
                "Password is required when username is provided".to_string(),
            )),
            (None, Some(_)) => Err(RegistryError::Validation(
                "Username is required when password is provided".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Standard numeric range validation
    pub fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(RegistryError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if timeout > 86400 {
            return Err(RegistryError::Validation(
                "Timeout cannot exceed 24 hours (86400 seconds)".to_string(),
            ));
        }

        Ok(())
    }
}
