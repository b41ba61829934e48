//! CodeStar Notifications API client

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_sdk_codestarnotifications::Client;
use aws_sdk_codestarnotifications::types::{
    DetailType as SdkDetailType, NotificationRuleStatus, Target as SdkTarget,
};
use stratus_core::error::{ProviderError, ProviderResult};

use crate::error::from_sdk;
use crate::notification_rule::{
    DetailType, NotificationRule, NotificationRuleState, RuleStatus, TargetSummary,
};

/// Remote calls the notification rule resource needs
///
/// Implementations classify their errors; a missing rule on describe is
/// either `Ok(None)` or a `NotFound` error.
#[async_trait]
pub trait NotificationsApi: Send + Sync {
    /// Returns the ARN of the new rule
    async fn create_notification_rule(&self, rule: &NotificationRule) -> ProviderResult<String>;

    async fn describe_notification_rule(
        &self,
        arn: &str,
    ) -> ProviderResult<Option<NotificationRuleState>>;

    /// Replaces name, detail type, event types, status and targets. Tags are untouched.
    async fn update_notification_rule(&self, arn: &str, rule: &NotificationRule)
    -> ProviderResult<()>;

    async fn delete_notification_rule(&self, arn: &str) -> ProviderResult<()>;

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> ProviderResult<()>;

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> ProviderResult<()>;

    /// Delete a target without unsubscribing it from other rules
    async fn delete_target(&self, address: &str) -> ProviderResult<()>;
}

/// [`NotificationsApi`] backed by the AWS SDK
pub struct SdkNotificationsClient {
    client: Client,
}

impl SdkNotificationsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn sdk_targets(rule: &NotificationRule) -> Vec<SdkTarget> {
    rule.target
        .iter()
        .map(|t| {
            SdkTarget::builder()
                .target_address(&t.address)
                .target_type(&t.target_type)
                .build()
        })
        .collect()
}

fn detail_type(value: &str) -> ProviderResult<DetailType> {
    match value {
        "BASIC" => Ok(DetailType::Basic),
        "FULL" => Ok(DetailType::Full),
        other => Err(ProviderError::new(format!("unexpected detail type: {}", other))),
    }
}

fn rule_status(value: &str) -> ProviderResult<RuleStatus> {
    match value {
        "ENABLED" => Ok(RuleStatus::Enabled),
        "DISABLED" => Ok(RuleStatus::Disabled),
        other => Err(ProviderError::new(format!("unexpected rule status: {}", other))),
    }
}

#[async_trait]
impl NotificationsApi for SdkNotificationsClient {
    async fn create_notification_rule(&self, rule: &NotificationRule) -> ProviderResult<String> {
        let tags: HashMap<String, String> = rule.tags.clone().into_iter().collect();
        let output = self
            .client
            .create_notification_rule()
            .name(&rule.name)
            .detail_type(SdkDetailType::from(rule.detail_type.as_str()))
            .set_event_type_ids(Some(rule.event_type_ids.iter().cloned().collect()))
            .resource(&rule.resource)
            .status(NotificationRuleStatus::from(rule.status.as_str()))
            .set_targets(Some(sdk_targets(rule)))
            .set_tags(if tags.is_empty() { None } else { Some(tags) })
            .send()
            .await
            .map_err(from_sdk)?;

        output
            .arn()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new("CreateNotificationRule returned no ARN"))
    }

    async fn describe_notification_rule(
        &self,
        arn: &str,
    ) -> ProviderResult<Option<NotificationRuleState>> {
        let output = self
            .client
            .describe_notification_rule()
            .arn(arn)
            .send()
            .await
            .map_err(from_sdk)?;

        let Some(name) = described_name(output.name()) else {
            log::debug!("DescribeNotificationRule returned an empty payload for {}", arn);
            return Ok(None);
        };
        let detail_type = detail_type(output.detail_type().map(|d| d.as_str()).unwrap_or_default())?;
        let status = rule_status(output.status().map(|s| s.as_str()).unwrap_or("ENABLED"))?;

        Ok(Some(NotificationRuleState {
            arn: arn.to_string(),
            name: name.to_string(),
            detail_type,
            event_type_ids: output
                .event_types()
                .iter()
                .filter_map(|e| e.event_type_id().map(str::to_string))
                .collect(),
            resource: output.resource().unwrap_or_default().to_string(),
            status,
            tags: output
                .tags()
                .map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
            target: output
                .targets()
                .iter()
                .map(|t| TargetSummary {
                    address: t.target_address().unwrap_or_default().to_string(),
                    target_type: t.target_type().unwrap_or_default().to_string(),
                    status: t.target_status().map(|s| s.as_str().to_string()),
                })
                .collect(),
        }))
    }

    async fn update_notification_rule(
        &self,
        arn: &str,
        rule: &NotificationRule,
    ) -> ProviderResult<()> {
        self.client
            .update_notification_rule()
            .arn(arn)
            .name(&rule.name)
            .detail_type(SdkDetailType::from(rule.detail_type.as_str()))
            .set_event_type_ids(Some(rule.event_type_ids.iter().cloned().collect()))
            .status(NotificationRuleStatus::from(rule.status.as_str()))
            .set_targets(Some(sdk_targets(rule)))
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn delete_notification_rule(&self, arn: &str) -> ProviderResult<()> {
        log::debug!("Deleting CodeStar notification rule: {}", arn);
        self.client
            .delete_notification_rule()
            .arn(arn)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> ProviderResult<()> {
        self.client
            .tag_resource()
            .arn(arn)
            .set_tags(Some(tags.clone().into_iter().collect()))
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> ProviderResult<()> {
        self.client
            .untag_resource()
            .arn(arn)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn delete_target(&self, address: &str) -> ProviderResult<()> {
        self.client
            .delete_target()
            .target_address(address)
            .force_unsubscribe_all(false)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}

/// The rule name, if the describe payload carries one
fn described_name(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}
