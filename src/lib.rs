//! Docker Registry Client Library
//!
//! Talks to Docker registries without knowing up front whether they speak the
//! legacy v1 index API or the v2 distribution API.
//!
//! - [`create_client`] returns a [`RegistryClient`] of the right generation,
//!   probing the registry when no version is requested.
//! - [`login`] verifies credentials with a single v2 ping deciding between
//!   the v1 and v2 login flows.
//!
//! The `*_v1` / `*_v2` functions bypass negotiation.

pub mod cli;
pub mod error;
pub mod logging;
pub mod negotiation;
pub mod reference;
pub mod registry;

pub use error::{RegistryError, Result};
pub use logging::Logger;
pub use negotiation::{ClientHandle, LoginNegotiator, VersionResolver};
pub use reference::{
    DEFAULT_INDEX_NAME, DEFAULT_TAG, DEFAULT_V1_INDEX_URL, DEFAULT_V2_REGISTRY, IndexInfo,
    RepoAndRef, RepoInfo, parse_index, parse_repo, parse_repo_and_ref, parse_repo_and_tag,
};
pub use registry::{
    ApiVersion, Credentials, CurrentRegistry, LOGIN_SUCCEEDED, LegacyRegistry, LoginContext,
    LoginResult, PingOutcome, PingResponse, RegistryClientV1, RegistryClientV2, RegistryV1,
    RegistryV2, RepositoryTarget, TransportConfig,
};

/// Client handle over the bundled v1 and v2 clients
pub type RegistryClient = ClientHandle<RegistryClientV1, RegistryClientV2>;

/// Options for [`create_client`] and the direct `create_client_v*` functions
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Repository, e.g. `busybox`, `alpine:latest`, `quay.io/quay/elasticsearch`
    pub name: String,
    /// Explicit API version: 1 or 2. Other values are rejected.
    pub version: Option<u32>,
    /// Used by the v2 client to request tokens; anonymous when unset
    pub credentials: Option<Credentials>,
    pub transport: TransportConfig,
    pub logger: Logger,
}

impl ClientOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            credentials: None,
            transport: TransportConfig::default(),
            logger: Logger::default(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn target(&self) -> Result<RepositoryTarget> {
        Ok(RepositoryTarget::parse(&self.name)?
            .with_optional_version(self.version)
            .with_credentials(self.credentials.clone()))
    }
}

/// Options for [`login`] and the direct `login_v*` functions
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Index to log in to; `None` means the official Docker index
    pub index: Option<String>,
    pub credentials: Credentials,
    pub transport: TransportConfig,
    pub logger: Logger,
}

impl LoginOptions {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            index: None,
            credentials,
            transport: TransportConfig::default(),
            logger: Logger::default(),
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn index_info(&self) -> Result<IndexInfo> {
        parse_index(self.index.as_deref())
    }
}

/// Create a client for `options.name`, using `options.version` when given
/// and probing the registry for v2 support otherwise.
pub async fn create_client(options: &ClientOptions) -> Result<RegistryClient> {
    if let Some(version) = options.version {
        ApiVersion::try_from(version)?;
    }
    let target = options.target()?;
    VersionResolver::from_config(&options.transport, options.logger.clone())?
        .resolve(&target)
        .await
}

/// Verify credentials against the index, whichever API generation it speaks
pub async fn login(options: &LoginOptions) -> Result<LoginResult> {
    let index = options.index_info()?;
    LoginNegotiator::from_config(&options.transport, options.logger.clone())?
        .login(&index, &options.credentials)
        .await
}

pub fn create_client_v1(options: &ClientOptions) -> Result<RegistryClientV1> {
    RegistryV1::new(&options.transport, options.logger.clone())?.create_client(&options.target()?)
}

pub async fn ping_index_v1(index: Option<&str>, transport: &TransportConfig) -> Result<PingResponse> {
    let index = parse_index(index)?;
    RegistryV1::new(transport, Logger::default())?
        .ping_index(&index)
        .await
}

pub async fn login_v1(options: &LoginOptions) -> Result<LoginResult> {
    let index = options.index_info()?;
    RegistryV1::new(&options.transport, options.logger.clone())?
        .login(&index, &options.credentials)
        .await
}

pub fn create_client_v2(options: &ClientOptions) -> Result<RegistryClientV2> {
    RegistryV2::new(&options.transport, options.logger.clone())?.create_client(&options.target()?)
}

pub async fn ping_v2(index: Option<&str>, transport: &TransportConfig) -> PingOutcome {
    let index = match parse_index(index) {
        Ok(index) => index,
        Err(e) => return PingOutcome::failed(e),
    };
    match RegistryV2::new(transport, Logger::default()) {
        Ok(registry) => registry.ping(&index).await,
        Err(e) => PingOutcome::failed(e),
    }
}

/// v2 login without a prior probe; the login pings on its own
pub async fn login_v2(options: &LoginOptions) -> Result<LoginResult> {
    let index = options.index_info()?;
    RegistryV2::new(&options.transport, options.logger.clone())?
        .login(&index, LoginContext::new(options.credentials.clone()))
        .await
}
