//! Data types shared by the protocol clients and the negotiation layer

use crate::error::{RegistryError, Result};
use crate::reference::{IndexInfo, RepoInfo, parse_repo_and_ref};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Status string reported by every successful login
pub const LOGIN_SUCCEEDED: &str = "Login Succeeded";

/// Registry API generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApiVersion {
    /// Legacy index API (`/v1/`)
    V1,
    /// Distribution API (`/v2/`)
    V2,
}

impl ApiVersion {
    pub fn as_u32(self) -> u32 {
        match self {
            ApiVersion::V1 => 1,
            ApiVersion::V2 => 2,
        }
    }
}

impl TryFrom<u32> for ApiVersion {
    type Error = RegistryError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(ApiVersion::V1),
            2 => Ok(ApiVersion::V2),
            other => Err(RegistryError::InvalidVersion(other)),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u32())
    }
}

/// Repository a client is created for, with an optional explicit API version.
///
/// The version is kept as given so that out-of-range selectors are reported
/// by the resolver rather than at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    repo: RepoInfo,
    version: Option<u32>,
    credentials: Option<Credentials>,
}

impl RepositoryTarget {
    pub fn new(repo: RepoInfo) -> Self {
        Self {
            repo,
            version: None,
            credentials: None,
        }
    }

    /// Parse `name[:tag|@digest]`; the tag or digest is not kept.
    pub fn parse(name: &str) -> Result<Self> {
        let parsed = parse_repo_and_ref(name, None)?;
        Ok(Self::new(parsed.repo))
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_optional_version(mut self, version: Option<u32>) -> Self {
        self.version = version;
        self
    }

    /// Credentials the created client authenticates its requests with
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn repo(&self) -> &RepoInfo {
        &self.repo
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn index(&self) -> &IndexInfo {
        &self.repo.index
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }
}

/// Credentials handed unmodified to the selected login implementation
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Decode the base64 `username:password` form stored in Docker config files
    pub fn from_docker_auth(encoded: &str) -> Result<Self> {
        let decoded = String::from_utf8(STANDARD.decode(encoded.trim())?)?;
        match decoded.split_once(':') {
            Some((username, password)) if !username.is_empty() => {
                Ok(Self::new(username, password))
            }
            _ => Err(RegistryError::Parse(
                "auth string must decode to <username>:<password>".to_string(),
            )),
        }
    }

    /// Encode as the base64 `username:password` form
    pub fn to_docker_auth(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Status and headers of a ping response
#[derive(Debug, Clone)]
pub struct PingResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl PingResponse {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Result of a v2 ping. A response and an error may both be present when
/// the registry answered with a non-success status.
#[derive(Debug, Clone, Default)]
pub struct PingOutcome {
    pub response: Option<PingResponse>,
    pub error: Option<RegistryError>,
}

impl PingOutcome {
    pub fn responded(response: PingResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    pub fn responded_with_error(response: PingResponse, error: RegistryError) -> Self {
        Self {
            response: Some(response),
            error: Some(error),
        }
    }

    pub fn failed(error: RegistryError) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    /// Collapse into a plain result, keeping the response only on success
    pub fn into_result(self) -> Result<PingResponse> {
        match (self.response, self.error) {
            (_, Some(error)) => Err(error),
            (Some(response), None) => Ok(response),
            (None, None) => Err(RegistryError::Transport(
                "ping produced neither a response nor an error".to_string(),
            )),
        }
    }
}

/// Input of a v2 login: the credentials plus whatever the negotiation probe
/// already learned, so the login can skip its own ping.
#[derive(Debug, Clone)]
pub struct LoginContext {
    pub credentials: Credentials,
    pub probe_response: Option<PingResponse>,
    pub probe_error: Option<RegistryError>,
}

impl LoginContext {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            probe_response: None,
            probe_error: None,
        }
    }

    pub fn with_probe(
        credentials: Credentials,
        response: PingResponse,
        error: Option<RegistryError>,
    ) -> Self {
        Self {
            credentials,
            probe_response: Some(response),
            probe_error: error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub status: String,
}

impl LoginResult {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    pub fn succeeded() -> Self {
        Self::new(LOGIN_SUCCEEDED)
    }
}

/// HTTP settings shared by both protocol clients
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Accept invalid TLS certificates and host names
    pub insecure: bool,
    pub timeout: Duration,
    pub user_agent: String,
    /// Honor `HTTP_PROXY` / `HTTPS_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: Duration::from_secs(300),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

impl TransportConfig {
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn without_proxy(mut self) -> Self {
        self.use_system_proxy = false;
        self
    }

    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone());

        if !self.use_system_proxy {
            builder = builder.no_proxy();
        }

        let builder = if self.insecure {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
        } else {
            builder
        };

        builder
            .build()
            .map_err(|e| RegistryError::Network(format!("Failed to create HTTP client: {}", e)))
    }
}
