//! Credential verification against whichever API generation a host speaks

use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::reference::IndexInfo;
use crate::registry::{
    Credentials, CurrentRegistry, LegacyRegistry, LoginContext, LoginResult, PingOutcome,
    RegistryV1, RegistryV2, TransportConfig,
};
use reqwest::StatusCode;

/// Logs in to an index, picking the protocol from a single v2 ping.
///
/// - no response at all: the ping error is returned, nothing else is tried
/// - `404`: the host has no v2 API, the v1 login runs
/// - anything else: the v2 login runs with the ping response attached, so
///   it can read the challenge without pinging again
#[derive(Debug, Clone)]
pub struct LoginNegotiator<L = RegistryV1, C = RegistryV2> {
    legacy: L,
    current: C,
    output: Logger,
}

impl LoginNegotiator {
    pub fn from_config(config: &TransportConfig, output: Logger) -> Result<Self> {
        let http = config.build_http_client()?;
        Ok(Self::new(
            RegistryV1::with_client(http.clone(), output.clone()),
            RegistryV2::with_client(http, output.clone()),
            output,
        ))
    }
}

impl<L, C> LoginNegotiator<L, C>
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

    pub async fn login(&self, index: &IndexInfo, credentials: &Credentials) -> Result<LoginResult> {
        self.output.verbose(&format!(
            "Logging in to {} as {}",
            index.name, credentials.username
        ));

        let PingOutcome { response, error } = self.current.ping(index).await;

        // Branch on whether a response exists; an error may accompany it.
        let Some(response) = response else {
            return Err(error.unwrap_or_else(|| {
                RegistryError::Transport(format!(
                    "v2 ping of {} returned neither a response nor an error",
                    index.name
                ))
            }));
        };

        if response.status == StatusCode::NOT_FOUND {
            self.output.detail(&format!(
                "{} has no v2 API (404), using v1 login",
                index.name
            ));
            return self.legacy.login(index, credentials).await;
        }

        self.output.detail(&format!(
            "{} answered v2 ping with {}, using v2 login",
            index.name, response.status
        ));
        let context = LoginContext::with_probe(credentials.clone(), response, error);
        self.current.login(index, context).await
    }
}
