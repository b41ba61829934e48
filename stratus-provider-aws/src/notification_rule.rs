//! CodeStar notification rule
//!
//! A rule subscribes targets (SNS topics, chatbot channels) to events of a
//! resource. Targets are created by the service on first subscription and
//! never removed by it, so the rule owns their cleanup.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::error::ProviderResult;
use stratus_core::provider::ResourceProvider;
use stratus_core::resource::Value;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::codestarnotifications::NotificationsApi;

pub const RESOURCE_TYPE: &str = "codestarnotifications.notification_rule";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetailType {
    Basic,
    Full,
}

impl DetailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailType::Basic => "BASIC",
            DetailType::Full => "FULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    #[default]
    Enabled,
    Disabled,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Enabled => "ENABLED",
            RuleStatus::Disabled => "DISABLED",
        }
    }
}

fn default_target_type() -> String {
    "SNS".to_string()
}

/// A subscribed target, identified by its address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub address: String,
    #[serde(rename = "type", default = "default_target_type")]
    pub target_type: String,
}

/// Desired state of a notification rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRule {
    pub name: String,
    pub detail_type: DetailType,
    pub event_type_ids: BTreeSet<String>,
    pub resource: String,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub target: BTreeSet<Target>,
}

/// Target as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub address: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Observed state of a notification rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRuleState {
    pub arn: String,
    pub name: String,
    pub detail_type: DetailType,
    pub event_type_ids: BTreeSet<String>,
    pub resource: String,
    pub status: RuleStatus,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub target: Vec<TargetSummary>,
}

/// Tags to set and tag keys to remove when going from `old` to `new`
pub fn tag_delta(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let set = new
        .iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let removed = old.keys().filter(|k| !new.contains_key(*k)).cloned().collect();
    (set, removed)
}

pub struct NotificationRuleProvider<C> {
    client: C,
}

impl<C: NotificationsApi> NotificationRuleProvider<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: NotificationsApi> ResourceProvider for NotificationRuleProvider<C> {
    type Desired = NotificationRule;
    type Observed = NotificationRuleState;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> ResourceSchema {
        let target = AttributeType::Block(vec![
            AttributeSchema::new("address", types::arn()).required(),
            AttributeSchema::new("type", AttributeType::String)
                .with_default(Value::String(default_target_type())),
            AttributeSchema::new("status", AttributeType::String).computed(),
        ]);

        ResourceSchema::new(RESOURCE_TYPE)
            .with_description("CodeStar notification rule")
            .attribute(AttributeSchema::new("arn", types::arn()).computed())
            .attribute(
                AttributeSchema::new("detail_type", types::string_enum(&["BASIC", "FULL"]))
                    .required(),
            )
            .attribute(
                AttributeSchema::new(
                    "event_type_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .required()
                .with_items(1, 200),
            )
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .with_length(1, 64)
                    .with_pattern(
                        r"^[A-Za-z0-9\-_ ]+$",
                        "must be one or more alphanumeric, hyphen, underscore or space characters",
                    ),
            )
            .attribute(
                AttributeSchema::new("resource", types::arn())
                    .required()
                    .force_new()
                    .with_description("ARN of the resource events are raised for"),
            )
            .attribute(
                AttributeSchema::new("status", types::string_enum(&["ENABLED", "DISABLED"]))
                    .with_default(Value::String("ENABLED".to_string())),
            )
            .attribute(AttributeSchema::new(
                "tags",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
            .attribute(
                AttributeSchema::new("target", AttributeType::Set(Box::new(target)))
                    .with_items(0, 10),
            )
    }

    fn desired_of(&self, observed: &NotificationRuleState) -> NotificationRule {
        NotificationRule {
            name: observed.name.clone(),
            detail_type: observed.detail_type,
            event_type_ids: observed.event_type_ids.clone(),
            resource: observed.resource.clone(),
            status: observed.status,
            tags: observed.tags.clone(),
            target: observed
                .target
                .iter()
                .map(|t| Target {
                    address: t.address.clone(),
                    target_type: t.target_type.clone(),
                })
                .collect(),
        }
    }

    fn dependents(&self, state: &NotificationRule) -> BTreeSet<String> {
        state.target.iter().map(|t| t.address.clone()).collect()
    }

    async fn create(&self, desired: &NotificationRule) -> ProviderResult<String> {
        self.client.create_notification_rule(desired).await
    }

    async fn find(&self, arn: &str) -> ProviderResult<Option<NotificationRuleState>> {
        self.client.describe_notification_rule(arn).await
    }

    async fn update(
        &self,
        arn: &str,
        old: &NotificationRule,
        new: &NotificationRule,
    ) -> ProviderResult<()> {
        self.client.update_notification_rule(arn, new).await?;

        let (set, removed) = tag_delta(&old.tags, &new.tags);
        if !removed.is_empty() {
            self.client.untag_resource(arn, &removed).await?;
        }
        if !set.is_empty() {
            self.client.tag_resource(arn, &set).await?;
        }
        Ok(())
    }

    async fn delete(&self, arn: &str) -> ProviderResult<()> {
        self.client.delete_notification_rule(arn).await
    }

    async fn delete_dependent(&self, address: &str) -> ProviderResult<()> {
        self.client.delete_target(address).await
    }
}
