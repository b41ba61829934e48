//! SSO Admin API client

use async_trait::async_trait;
use aws_sdk_ssoadmin::Client;
use serde::{Deserialize, Serialize};
use stratus_core::error::ProviderResult;

use crate::error::from_sdk;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsoInstance {
    pub arn: String,
    pub identity_store_id: String,
}

/// One page of ListInstances
#[derive(Debug, Clone, Default)]
pub struct InstancePage {
    pub instances: Vec<SsoInstance>,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait SsoAdminApi: Send + Sync {
    async fn list_instances(&self, next_token: Option<String>) -> ProviderResult<InstancePage>;
}

/// [`SsoAdminApi`] backed by the AWS SDK
pub struct SdkSsoAdminClient {
    client: Client,
}

impl SdkSsoAdminClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SsoAdminApi for SdkSsoAdminClient {
    async fn list_instances(&self, next_token: Option<String>) -> ProviderResult<InstancePage> {
        let output = self
            .client
            .list_instances()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(from_sdk)?;

        Ok(InstancePage {
            instances: output
                .instances()
                .iter()
                .map(|i| SsoInstance {
                    arn: i.instance_arn().unwrap_or_default().to_string(),
                    identity_store_id: i.identity_store_id().unwrap_or_default().to_string(),
                })
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }
}
