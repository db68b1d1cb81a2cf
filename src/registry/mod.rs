//! Registry module for Docker registry interactions
//!
//! This module defines the capability traits the negotiation layer talks to,
//! plus reqwest-backed implementations of both protocol generations:
//! the legacy v1 index API and the v2 distribution API.

pub mod auth;
pub mod types;
pub mod v1;
pub mod v2;

use crate::error::Result;
use crate::reference::IndexInfo;
use async_trait::async_trait;

pub use types::{
    ApiVersion, Credentials, LOGIN_SUCCEEDED, LoginContext, LoginResult, PingOutcome,
    PingResponse, RepositoryTarget, TransportConfig,
};
pub use v1::{RegistryClientV1, RegistryV1};
pub use v2::{RegistryClientV2, RegistryV2};

/// Probe for v2 support on an already created client
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn supports_v2(&self) -> Result<bool>;
}

/// Operations of the legacy (v1) protocol
#[async_trait]
pub trait LegacyRegistry: Send + Sync {
    type Client: Send;

    fn create_client(&self, target: &RepositoryTarget) -> Result<Self::Client>;

    async fn ping_index(&self, index: &IndexInfo) -> Result<PingResponse>;

    async fn login(&self, index: &IndexInfo, credentials: &Credentials) -> Result<LoginResult>;
}

/// Operations of the current (v2) protocol
#[async_trait]
pub trait CurrentRegistry: Send + Sync {
    type Client: CapabilityProbe + Send;

    fn create_client(&self, target: &RepositoryTarget) -> Result<Self::Client>;

    /// Ping the `/v2/` endpoint. Never fails outright: a missing response is
    /// reported through [`PingOutcome::error`].
    async fn ping(&self, index: &IndexInfo) -> PingOutcome;

    async fn login(&self, index: &IndexInfo, context: LoginContext) -> Result<LoginResult>;
}
