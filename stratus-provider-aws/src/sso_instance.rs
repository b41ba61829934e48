//! SSO instance data source
//!
//! An account has at most one IAM Identity Center instance; anything else
//! is an error rather than a guess.

use async_trait::async_trait;
use serde::Deserialize;
use stratus_core::error::{ProviderError, ProviderResult};
use stratus_core::provider::DataSource;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::ssoadmin::{SsoAdminApi, SsoInstance};

pub const DATA_SOURCE_TYPE: &str = "ssoadmin.instance";

/// The data source takes no arguments
#[derive(Debug, Deserialize)]
pub struct NoArgs {}

pub struct SsoInstanceSource<C> {
    client: C,
}

impl<C: SsoAdminApi> SsoInstanceSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    async fn list_all(&self) -> ProviderResult<Vec<SsoInstance>> {
        let mut instances = Vec::new();
        let mut next_token = None;
        loop {
            let page = self.client.list_instances(next_token).await?;
            instances.extend(page.instances);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(instances)
    }
}

#[async_trait]
impl<C: SsoAdminApi> DataSource for SsoInstanceSource<C> {
    type Args = NoArgs;
    type Observed = SsoInstance;

    fn type_name(&self) -> &'static str {
        DATA_SOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(DATA_SOURCE_TYPE)
            .with_description("The IAM Identity Center instance of the account")
            .attribute(AttributeSchema::new("arn", types::arn()).computed())
            .attribute(AttributeSchema::new("identity_store_id", AttributeType::String).computed())
    }

    async fn read(&self, _args: &NoArgs) -> ProviderResult<(String, SsoInstance)> {
        log::debug!("Reading SSO instances");
        let mut instances = self.list_all().await?;

        match instances.len() {
            0 => Err(ProviderError::not_found("no instance found")),
            1 => {
                let instance = instances.remove(0);
                log::debug!("Received SSO instance: {}", instance.arn);
                Ok((instance.arn.clone(), instance))
            }
            n => {
                let arns: Vec<&str> = instances.iter().map(|i| i.arn.as_str()).collect();
                Err(ProviderError::new(format!(
                    "found multiple instances ({}): {}",
                    n,
                    arns.join(", ")
                )))
            }
        }
    }
}
