//! Client for the v2 distribution API
//!
//! [`RegistryV2`] is the protocol entry point (ping, login, client creation);
//! [`RegistryClientV2`] is the per-repository handle returned to callers.

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::reference::{IndexInfo, RepoInfo};
use crate::registry::auth::{Auth, AuthChallenge, parse_auth_challenge};
use crate::registry::types::{
    ApiVersion, Credentials, LoginContext, LoginResult, PingOutcome, PingResponse,
    RepositoryTarget, TransportConfig,
};
use crate::registry::{CapabilityProbe, CurrentRegistry};
use async_trait::async_trait;
use reqwest::header::WWW_AUTHENTICATE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

/// Header a v2 registry uses to advertise its API version
pub const API_VERSION_HEADER: &str = "docker-distribution-api-version";
const V2_API_TOKEN: &str = "registry/2.0";

/// Whether a ping response advertises the v2 API
pub fn advertises_v2(response: &PingResponse) -> bool {
    response
        .header(API_VERSION_HEADER)
        .map(|value| {
            value
                .split(|c: char| c.is_whitespace() || c == ',')
                .any(|token| token == V2_API_TOKEN)
        })
        .unwrap_or(false)
}

async fn ping_url(http: &Client, url: Url, output: &Logger) -> PingOutcome {
    output.verbose(&format!("Pinging v2 endpoint: {}", url));

    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return PingOutcome::failed(NetworkErrorHandler::handle_transport_error(&e, "v2 ping"));
        }
    };

    let status = response.status();
    let ping = PingResponse::new(status, response.headers().clone());
    output.detail(&format!("v2 ping response status: {}", status));

    if status.is_success() {
        return PingOutcome::responded(ping);
    }

    let error_text = response.text().await.unwrap_or_default();
    let error = HttpErrorHandler::handle_registry_error(status, error_text.trim(), "v2 ping");
    PingOutcome::responded_with_error(ping, error)
}

fn v2_root(index: &IndexInfo) -> Result<Url> {
    Ok(index.v2_url()?.join("v2/")?)
}

/// Entry point for v2 protocol operations
#[derive(Debug, Clone)]
pub struct RegistryV2 {
    http: Client,
    auth: Auth,
    output: Logger,
}

impl RegistryV2 {
    pub fn new(config: &TransportConfig, output: Logger) -> Result<Self> {
        Ok(Self::with_client(config.build_http_client()?, output))
    }

    pub fn with_client(http: Client, output: Logger) -> Self {
        Self {
            auth: Auth::new(http.clone(), output.clone()),
            http,
            output,
        }
    }

    async fn check_challenge(
        &self,
        index: &IndexInfo,
        response: &PingResponse,
        context: &LoginContext,
    ) -> Result<()> {
        let header = response.header("www-authenticate").ok_or_else(|| {
            RegistryError::Auth("missing WWW-Authenticate header in v2 ping response".to_string())
        })?;

        match parse_auth_challenge(header) {
            Some(AuthChallenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                self.output.detail(&format!(
                    "Bearer challenge: realm={}, service={:?}",
                    realm, service
                ));
                self.auth
                    .request_token(
                        &realm,
                        service.as_deref(),
                        scope.as_deref(),
                        Some(&context.credentials),
                    )
                    .await
                    .map(|_| ())
            }
            Some(AuthChallenge::Basic { .. }) => {
                self.output.detail("Basic challenge");
                self.auth
                    .verify_basic(v2_root(index)?, &context.credentials)
                    .await
            }
            None => Err(RegistryError::Auth(format!(
                "unsupported authentication challenge: {}",
                header
            ))),
        }
    }
}

#[async_trait]
impl CurrentRegistry for RegistryV2 {
    type Client = RegistryClientV2;

    fn create_client(&self, target: &RepositoryTarget) -> Result<RegistryClientV2> {
        Ok(RegistryClientV2 {
            http: self.http.clone(),
            auth: self.auth.clone(),
            base: target.index().v2_url()?,
            repo: target.repo().clone(),
            credentials: target.credentials().cloned(),
            output: self.output.clone(),
        })
    }

    async fn ping(&self, index: &IndexInfo) -> PingOutcome {
        match v2_root(index) {
            Ok(url) => ping_url(&self.http, url, &self.output).await,
            Err(e) => PingOutcome::failed(e),
        }
    }

    async fn login(&self, index: &IndexInfo, context: LoginContext) -> Result<LoginResult> {
        let (response, probe_error) = match (&context.probe_response, &context.probe_error) {
            (Some(response), error) => {
                self.output.detail("Reusing v2 ping response from negotiation");
                (response.clone(), error.clone())
            }
            (None, _) => {
                let outcome = self.ping(index).await;
                match outcome.response {
                    Some(response) => (response, outcome.error),
                    None => {
                        return Err(outcome.error.unwrap_or_else(|| {
                            RegistryError::Transport("v2 ping returned no response".to_string())
                        }));
                    }
                }
            }
        };

        if response.status.is_success() {
            self.output
                .detail("Registry does not require authentication");
            return Ok(LoginResult::succeeded());
        }

        if response.status == StatusCode::UNAUTHORIZED {
            self.check_challenge(index, &response, &context).await?;
            return Ok(LoginResult::succeeded());
        }

        Err(probe_error.unwrap_or_else(|| {
            HttpErrorHandler::handle_registry_error(response.status, "", "v2 login")
        }))
    }
}

#[derive(Debug, Deserialize)]
struct TagList {
    tags: Option<Vec<String>>,
}

/// Authorization attached to a request retried after a 401
enum RetryAuth {
    Bearer(String),
    Basic(Credentials),
}

impl RetryAuth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            RetryAuth::Bearer(token) => request.bearer_auth(token),
            RetryAuth::Basic(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
        }
    }
}

/// Handle for a repository on a v2 registry
#[derive(Debug, Clone)]
pub struct RegistryClientV2 {
    http: Client,
    auth: Auth,
    base: Url,
    repo: RepoInfo,
    credentials: Option<Credentials>,
    output: Logger,
}

impl RegistryClientV2 {
    pub fn api_version(&self) -> ApiVersion {
        ApiVersion::V2
    }

    pub fn repo(&self) -> &RepoInfo {
        &self.repo
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn ping(&self) -> PingOutcome {
        match self.base.join("v2/") {
            Ok(url) => ping_url(&self.http, url, &self.output).await,
            Err(e) => PingOutcome::failed(e.into()),
        }
    }

    /// Answer an authentication challenge for this repository. Bearer
    /// challenges get a pull token, anonymous when no credentials are set.
    async fn authorize(&self, header: &str) -> Result<RetryAuth> {
        match parse_auth_challenge(header) {
            Some(AuthChallenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                let scope = scope
                    .unwrap_or_else(|| format!("repository:{}:pull", self.repo.remote_name));
                let token = self
                    .auth
                    .request_token(
                        &realm,
                        service.as_deref(),
                        Some(&scope),
                        self.credentials.as_ref(),
                    )
                    .await?;
                Ok(RetryAuth::Bearer(token))
            }
            Some(AuthChallenge::Basic { .. }) => match &self.credentials {
                Some(credentials) => Ok(RetryAuth::Basic(credentials.clone())),
                None => Err(RegistryError::Auth(
                    "registry requires basic authentication but no credentials were given"
                        .to_string(),
                )),
            },
            None => Err(RegistryError::Auth(format!(
                "unsupported authentication challenge: {}",
                header
            ))),
        }
    }

    /// GET `url`, answering one authentication challenge if the registry sends it
    async fn get_authorized(&self, url: Url, operation: &str) -> Result<Response> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, operation))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let Some(header) = challenge else {
            return Ok(response);
        };

        self.output
            .detail(&format!("{} challenged: {}", operation, header));
        let auth = self.authorize(&header).await?;
        auth.apply(self.http.get(url))
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, operation))
    }

    /// List tags of the repository, authenticating when the registry asks for it
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let url = self
            .base
            .join(&format!("v2/{}/tags/list", self.repo.remote_name))?;
        self.output.verbose(&format!("Listing tags: {}", url));

        let response = self.get_authorized(url, "tag listing").await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                error_text.trim(),
                "tag listing",
            ));
        }

        let list: TagList = response.json().await?;
        Ok(list.tags.unwrap_or_default())
    }
}

#[async_trait]
impl CapabilityProbe for RegistryClientV2 {
    async fn supports_v2(&self) -> Result<bool> {
        let outcome = self.ping().await;
        match outcome.response {
            Some(response) => {
                let supported = advertises_v2(&response);
                self.output.detail(&format!(
                    "{} advertises v2: {}",
                    self.base, supported
                ));
                Ok(supported)
            }
            None => Err(outcome.error.unwrap_or_else(|| {
                RegistryError::Transport("v2 ping returned no response".to_string())
            })),
        }
    }
}
