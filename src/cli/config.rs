//! Configuration management module

use crate::error::{RegistryError, Result};
use crate::error::handlers::ValidationErrorHandler;
use crate::registry::{Credentials, TransportConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_TIMEOUT: &str = "REGISTRY_CLIENT_TIMEOUT";
pub const ENV_INSECURE: &str = "REGISTRY_CLIENT_INSECURE";
pub const ENV_VERBOSE: &str = "REGISTRY_CLIENT_VERBOSE";
pub const ENV_USERNAME: &str = "REGISTRY_CLIENT_USERNAME";
pub const ENV_PASSWORD: &str = "REGISTRY_CLIENT_PASSWORD";
pub const ENV_AUTH: &str = "REGISTRY_CLIENT_AUTH";

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    /// Base64 `username:password`, as stored in Docker config files
    pub auth: Option<String>,
}

impl AuthConfig {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username: Some(username),
            password: Some(password),
            ..Self::default()
        }
    }

    /// Read credentials through `lookup`, typically `std::env::var`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
            email: None,
            auth: lookup(ENV_AUTH),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: AuthConfig) -> Self {
        Self {
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            email: self.email.or(fallback.email),
            auth: self.auth.or(fallback.auth),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ValidationErrorHandler::validate_credentials(&self.username, &self.password)?;
        if let Some(username) = &self.username {
            if username.is_empty() {
                return Err(RegistryError::Validation(
                    "Username cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve into credentials; an explicit username/password pair wins over `auth`
    pub fn credentials(&self) -> Result<Credentials> {
        self.validate()?;

        let credentials = match (&self.username, &self.password, &self.auth) {
            (Some(username), Some(password), _) => Credentials::new(username, password),
            (None, None, Some(auth)) => Credentials::from_docker_auth(auth)?,
            _ => {
                return Err(RegistryError::Validation(
                    "No credentials given: pass --username/--password or --auth".to_string(),
                ));
            }
        };

        Ok(match &self.email {
            Some(email) => credentials.with_email(email),
            None => credentials,
        })
    }
}

/// Settings given explicitly on the command line; `None` leaves the
/// configured value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub timeout: Option<u64>,
    pub insecure: Option<bool>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network timeout in seconds
    pub timeout: u64,
    pub insecure: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout: 300,
            insecure: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        ValidationErrorHandler::validate_timeout(self.timeout)?;
        if self.verbose && self.quiet {
            return Err(RegistryError::Configuration(
                "verbose and quiet cannot both be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(timeout) = lookup(ENV_TIMEOUT).and_then(|val| val.parse().ok()) {
            config.timeout = timeout;
        }
        if let Some(val) = lookup(ENV_INSECURE) {
            config.insecure = is_truthy(&val);
        }
        if let Some(val) = lookup(ENV_VERBOSE) {
            config.verbose = is_truthy(&val);
        }

        config
    }

    /// Create config from environment variables and defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay explicitly given settings, whatever their value
    pub fn merge(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        if let Some(insecure) = overrides.insecure {
            self.insecure = insecure;
        }
        if let Some(verbose) = overrides.verbose {
            self.verbose = verbose;
        }
        if let Some(quiet) = overrides.quiet {
            self.quiet = quiet;
        }

        self
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default()
            .with_insecure(self.insecure)
            .with_timeout(Duration::from_secs(self.timeout))
    }
}
