//! Version-polymorphic client handle

use crate::error::Result;
use crate::reference::RepoInfo;
use crate::registry::{ApiVersion, PingResponse, RegistryClientV1, RegistryClientV2};

/// A client for one protocol generation, owned by the caller
#[derive(Debug, Clone)]
pub enum ClientHandle<V1 = RegistryClientV1, V2 = RegistryClientV2> {
    V1(V1),
    V2(V2),
}

impl<V1, V2> ClientHandle<V1, V2> {
    pub fn api_version(&self) -> ApiVersion {
        match self {
            ClientHandle::V1(_) => ApiVersion::V1,
            ClientHandle::V2(_) => ApiVersion::V2,
        }
    }

    pub fn as_v1(&self) -> Option<&V1> {
        match self {
            ClientHandle::V1(client) => Some(client),
            ClientHandle::V2(_) => None,
        }
    }

    pub fn as_v2(&self) -> Option<&V2> {
        match self {
            ClientHandle::V2(client) => Some(client),
            ClientHandle::V1(_) => None,
        }
    }

    pub fn into_v1(self) -> Option<V1> {
        match self {
            ClientHandle::V1(client) => Some(client),
            ClientHandle::V2(_) => None,
        }
    }

    pub fn into_v2(self) -> Option<V2> {
        match self {
            ClientHandle::V2(client) => Some(client),
            ClientHandle::V1(_) => None,
        }
    }
}

impl ClientHandle {
    pub fn repo(&self) -> &RepoInfo {
        match self {
            ClientHandle::V1(client) => client.repo(),
            ClientHandle::V2(client) => client.repo(),
        }
    }

    pub fn base_url(&self) -> &url::Url {
        match self {
            ClientHandle::V1(client) => client.base_url(),
            ClientHandle::V2(client) => client.base_url(),
        }
    }

    /// Ping the endpoint of whichever API generation this handle speaks
    pub async fn ping(&self) -> Result<PingResponse> {
        match self {
            ClientHandle::V1(client) => client.ping().await,
            ClientHandle::V2(client) => client.ping().await.into_result(),
        }
    }

    pub async fn list_tags(&self) -> Result<Vec<String>> {
        match self {
            ClientHandle::V1(client) => client.list_tags().await,
            ClientHandle::V2(client) => client.list_tags().await,
        }
    }
}
