//! Client for the legacy v1 index API

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::reference::{IndexInfo, RepoInfo};
use crate::registry::LegacyRegistry;
use crate::registry::types::{
    ApiVersion, Credentials, LoginResult, PingResponse, RepositoryTarget, TransportConfig,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use url::Url;

pub const ACCOUNT_CREATED: &str =
    "Account created. Please use the confirmation link we sent to your e-mail to activate it.";
const ACCOUNT_EXISTS: &str = "Username or email already exists";

async fn ping_url(http: &Client, url: Url, output: &Logger) -> Result<PingResponse> {
    output.verbose(&format!("Pinging v1 index: {}", url));

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, "v1 index ping"))?;

    let status = response.status();
    output.detail(&format!("v1 ping response status: {}", status));
    if status.is_success() {
        Ok(PingResponse::new(status, response.headers().clone()))
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(HttpErrorHandler::handle_registry_error(
            status,
            error_text.trim(),
            "v1 index ping",
        ))
    }
}

/// Entry point for v1 protocol operations
#[derive(Debug, Clone)]
pub struct RegistryV1 {
    http: Client,
    output: Logger,
}

impl RegistryV1 {
    pub fn new(config: &TransportConfig, output: Logger) -> Result<Self> {
        Ok(Self::with_client(config.build_http_client()?, output))
    }

    pub fn with_client(http: Client, output: Logger) -> Self {
        Self { http, output }
    }

    /// The account exists: check the password against it
    async fn verify_existing_account(
        &self,
        users_url: Url,
        credentials: &Credentials,
    ) -> Result<LoginResult> {
        self.output
            .detail("Account exists, verifying credentials with basic auth");

        let response = self
            .http
            .get(users_url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, "v1 login"))?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(LoginResult::succeeded()),
            StatusCode::UNAUTHORIZED => Err(RegistryError::Auth(
                "Wrong login/password, please try again".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(RegistryError::Auth(
                "Login: Account is not Active. Please check your e-mail for a confirmation link."
                    .to_string(),
            )),
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                Err(HttpErrorHandler::handle_registry_error(
                    status,
                    error_text.trim(),
                    "v1 login",
                ))
            }
        }
    }
}

#[async_trait]
impl LegacyRegistry for RegistryV1 {
    type Client = RegistryClientV1;

    fn create_client(&self, target: &RepositoryTarget) -> Result<RegistryClientV1> {
        Ok(RegistryClientV1 {
            http: self.http.clone(),
            base: target.index().v1_url()?,
            repo: target.repo().clone(),
            output: self.output.clone(),
        })
    }

    async fn ping_index(&self, index: &IndexInfo) -> Result<PingResponse> {
        let url = index.v1_url()?.join("v1/_ping")?;
        ping_url(&self.http, url, &self.output).await
    }

    async fn login(&self, index: &IndexInfo, credentials: &Credentials) -> Result<LoginResult> {
        let users_url = index.v1_url()?.join("v1/users/")?;
        self.output.verbose(&format!(
            "Logging in to v1 index {} as {}",
            index.name, credentials.username
        ));

        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
            "email": credentials.email.clone().unwrap_or_default(),
        });

        let response = self
            .http
            .post(users_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, "v1 login"))?;

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        let message = error_text.trim().trim_matches('"');

        match status {
            StatusCode::CREATED => Ok(LoginResult::new(ACCOUNT_CREATED)),
            StatusCode::BAD_REQUEST if message == ACCOUNT_EXISTS => {
                self.verify_existing_account(users_url, credentials).await
            }
            StatusCode::BAD_REQUEST => Err(RegistryError::Registry(message.to_string())),
            _ => Err(HttpErrorHandler::handle_registry_error(
                status, message, "v1 login",
            )),
        }
    }
}

/// Handle for a repository on a v1 index
#[derive(Debug, Clone)]
pub struct RegistryClientV1 {
    http: Client,
    base: Url,
    repo: RepoInfo,
    output: Logger,
}

impl RegistryClientV1 {
    pub fn api_version(&self) -> ApiVersion {
        ApiVersion::V1
    }

    pub fn repo(&self) -> &RepoInfo {
        &self.repo
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn ping(&self) -> Result<PingResponse> {
        ping_url(&self.http, self.base.join("v1/_ping")?, &self.output).await
    }

    /// List tags of the repository. Indexes answer either with a
    /// `{tag: image}` object or a `[{name, layer}]` array.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        let url = self
            .base
            .join(&format!("v1/repositories/{}/tags", self.repo.remote_name))?;
        self.output.verbose(&format!("Listing tags: {}", url));

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, "tag listing"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                error_text.trim(),
                "tag listing",
            ));
        }

        tags_from_json(response.json().await?)
    }
}

fn tags_from_json(value: Value) -> Result<Vec<String>> {
    let mut tags: Vec<String> = match value {
        Value::Object(map) => map.into_iter().map(|(tag, _)| tag).collect(),
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
        other => {
            return Err(RegistryError::Parse(format!(
                "unexpected v1 tag list payload: {}",
                other
            )));
        }
    };
    tags.sort();
    Ok(tags)
}
