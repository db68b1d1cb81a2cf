//! Authentication helpers for the v2 login flow
//!
//! Parses `WWW-Authenticate` challenges and performs the matching
//! credential check: a token request for `Bearer`, an authenticated
//! `/v2/` request for `Basic`.

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::types::Credentials;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// A parsed `WWW-Authenticate` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic {
        realm: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Split `key="value", key2=value2` into a map. Quoted values may contain commas.
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let key: String = std::iter::from_fn(|| chars.next_if(|c| *c != '=' && *c != ','))
            .collect();
        if key.trim().is_empty() {
            break;
        }
        if chars.next_if_eq(&'=').is_none() {
            continue;
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value: String = if chars.next_if_eq(&'"').is_some() {
            let mut value = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    other => value.push(other),
                }
            }
            value
        } else {
            std::iter::from_fn(|| chars.next_if(|c| *c != ',')).collect()
        };

        params.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    params
}

/// Parse a `WWW-Authenticate` header value
pub fn parse_auth_challenge(header: &str) -> Option<AuthChallenge> {
    let header = header.trim();
    let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
    let mut params = parse_params(rest);

    match scheme.to_ascii_lowercase().as_str() {
        "bearer" => Some(AuthChallenge::Bearer {
            realm: params.remove("realm")?,
            service: params.remove("service"),
            scope: params.remove("scope"),
        }),
        "basic" => Some(AuthChallenge::Basic {
            realm: params.remove("realm"),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Auth {
    client: Client,
    output: Logger,
}

impl Auth {
    pub fn new(client: Client, output: Logger) -> Self {
        Self { client, output }
    }

    /// Exchange credentials for a token at the challenge realm. Without
    /// credentials an anonymous token is requested.
    pub async fn request_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<String> {
        let mut url = Url::parse(realm)
            .map_err(|e| RegistryError::Auth(format!("Invalid token realm '{}': {}", realm, e)))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = service {
                query.append_pair("service", service);
            }
            if let Some(scope) = scope {
                query.append_pair("scope", scope);
            }
            if let Some(credentials) = credentials {
                query.append_pair("account", &credentials.username);
            }
        }

        self.output.detail(&format!("Requesting token from: {}", url));

        let request = self.client.get(url);
        let request = match credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, "token request"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            self.output.detail(&format!(
                "Token request failed with status {}: {}",
                status, error_text
            ));
            return Err(HttpErrorHandler::handle_auth_error(status, &error_text));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse token response: {}", e)))?;

        if let Some(expires_in) = token_response.expires_in {
            self.output
                .detail(&format!("Token expires in {} seconds", expires_in));
        }

        token_response
            .token
            .or(token_response.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RegistryError::Auth("Token response did not contain a token".to_string()))
    }

    /// Verify credentials with basic auth against an endpoint that challenged for it
    pub async fn verify_basic(&self, url: Url, credentials: &Credentials) -> Result<()> {
        self.output
            .detail(&format!("Verifying basic credentials against: {}", url));

        let response = self
            .client
            .get(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_transport_error(&e, "basic auth check"))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(HttpErrorHandler::handle_auth_error(status, &error_text))
        }
    }
}
