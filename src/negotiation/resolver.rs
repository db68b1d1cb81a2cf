//! Selection of the API generation for a repository

use crate::error::Result;
use crate::logging::Logger;
use crate::negotiation::ClientHandle;
use crate::registry::{
    ApiVersion, CapabilityProbe, CurrentRegistry, LegacyRegistry, RegistryV1, RegistryV2,
    RepositoryTarget, TransportConfig,
};

/// Returns a client of the right generation for a repository target.
///
/// An explicit version is honored without touching the network. Without
/// one, a v2 client is created and asked whether the host supports v2; if
/// not, a v1 client is returned instead.
#[derive(Debug, Clone)]
pub struct VersionResolver<L = RegistryV1, C = RegistryV2> {
    legacy: L,
    current: C,
    output: Logger,
}

impl VersionResolver {
    /// Resolver backed by the reqwest clients, sharing one connection pool
    pub fn from_config(config: &TransportConfig, output: Logger) -> Result<Self> {
        let http = config.build_http_client()?;
        Ok(Self::new(
            RegistryV1::with_client(http.clone(), output.clone()),
            RegistryV2::with_client(http, output.clone()),
            output,
        ))
    }
}

impl<L, C> VersionResolver<L, C>
where
    L: LegacyRegistry,
    C: CurrentRegistry,
{
    pub fn new(legacy: L, current: C, output: Logger) -> Self {
        Self {
            legacy,
            current,
            output,
        }
    }

    pub fn legacy(&self) -> &L {
        &self.legacy
    }

    pub fn current(&self) -> &C {
        &self.current
    }

    pub async fn resolve(
        &self,
        target: &RepositoryTarget,
    ) -> Result<ClientHandle<L::Client, C::Client>> {
        let requested = target.version().map(ApiVersion::try_from).transpose()?;
        let name = &target.repo().canonical_name;

        match requested {
            Some(ApiVersion::V1) => {
                self.output
                    .verbose(&format!("Using requested API v1 for {}", name));
                Ok(ClientHandle::V1(self.legacy.create_client(target)?))
            }
            Some(ApiVersion::V2) => {
                self.output
                    .verbose(&format!("Using requested API v2 for {}", name));
                Ok(ClientHandle::V2(self.current.create_client(target)?))
            }
            None => self.detect(target).await,
        }
    }

    async fn detect(
        &self,
        target: &RepositoryTarget,
    ) -> Result<ClientHandle<L::Client, C::Client>> {
        let name = &target.repo().canonical_name;
        self.output
            .verbose(&format!("Detecting registry API version for {}", name));

        let client = self.current.create_client(target)?;
        if client.supports_v2().await? {
            self.output.detail(&format!("{} supports API v2", name));
            return Ok(ClientHandle::V2(client));
        }

        drop(client);
        self.output.detail(&format!(
            "{} does not support API v2, falling back to v1",
            name
        ));
        Ok(ClientHandle::V1(self.legacy.create_client(target)?))
    }
}
