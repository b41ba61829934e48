//! In-memory fakes of the AWS APIs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use stratus_core::error::ProviderResult;

use crate::codestarnotifications::NotificationsApi;
use crate::error::{TARGET_SUBSCRIBED_MESSAGE, service_error};
use crate::notification_rule::{NotificationRule, NotificationRuleState, TargetSummary};
use crate::ssoadmin::{InstancePage, SsoAdminApi, SsoInstance};

/// Notification rules and their implicitly created targets
#[derive(Default)]
pub struct FakeNotifications {
    pub(crate) rules: Mutex<HashMap<String, NotificationRuleState>>,
    pub(crate) targets: Mutex<BTreeSet<String>>,
    pub(crate) deleted_targets: Mutex<Vec<String>>,
    /// Targets subscribed by rules this fake does not know about
    pub external_subscriptions: HashSet<String>,
    /// Number of target deletions to reject with throttling first
    pub throttle_target_deletes: usize,
}

impl FakeNotifications {
    fn arn(name: &str) -> String {
        format!(
            "arn:aws:codestar-notifications:us-east-1:123456789012:notificationrule/{}",
            name
        )
    }

    fn summaries(rule: &NotificationRule) -> Vec<TargetSummary> {
        rule.target
            .iter()
            .map(|t| TargetSummary {
                address: t.address.clone(),
                target_type: t.target_type.clone(),
                status: Some("ACTIVE".to_string()),
            })
            .collect()
    }

    fn subscribe(&self, rule: &NotificationRule) {
        let mut targets = self.targets.lock().unwrap();
        targets.extend(rule.target.iter().map(|t| t.address.clone()));
    }

    /// Delete a rule out of band
    pub fn remove_rule(&self, arn: &str) {
        self.rules.lock().unwrap().remove(arn);
    }

    pub fn target_exists(&self, address: &str) -> bool {
        self.targets.lock().unwrap().contains(address)
    }

    /// Every DeleteTarget call, in order
    pub fn deleted_targets(&self) -> Vec<String> {
        self.deleted_targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationsApi for FakeNotifications {
    async fn create_notification_rule(&self, rule: &NotificationRule) -> ProviderResult<String> {
        let arn = Self::arn(&rule.name);
        let mut rules = self.rules.lock().unwrap();
        if rules.contains_key(&arn) {
            return Err(service_error(
                "ResourceAlreadyExistsException",
                "A notification rule with this name already exists",
            ));
        }
        rules.insert(
            arn.clone(),
            NotificationRuleState {
                arn: arn.clone(),
                name: rule.name.clone(),
                detail_type: rule.detail_type,
                event_type_ids: rule.event_type_ids.clone(),
                resource: rule.resource.clone(),
                status: rule.status,
                tags: rule.tags.clone(),
                target: Self::summaries(rule),
            },
        );
        drop(rules);
        self.subscribe(rule);
        Ok(arn)
    }

    async fn describe_notification_rule(
        &self,
        arn: &str,
    ) -> ProviderResult<Option<NotificationRuleState>> {
        self.rules
            .lock()
            .unwrap()
            .get(arn)
            .cloned()
            .map(Some)
            .ok_or_else(|| service_error("ResourceNotFoundException", "Rule not found"))
    }

    async fn update_notification_rule(
        &self,
        arn: &str,
        rule: &NotificationRule,
    ) -> ProviderResult<()> {
        let mut rules = self.rules.lock().unwrap();
        let existing = rules
            .get_mut(arn)
            .ok_or_else(|| service_error("ResourceNotFoundException", "Rule not found"))?;
        existing.name = rule.name.clone();
        existing.detail_type = rule.detail_type;
        existing.event_type_ids = rule.event_type_ids.clone();
        existing.status = rule.status;
        existing.target = Self::summaries(rule);
        drop(rules);
        self.subscribe(rule);
        Ok(())
    }

    async fn delete_notification_rule(&self, arn: &str) -> ProviderResult<()> {
        match self.rules.lock().unwrap().remove(arn) {
            Some(_) => Ok(()),
            None => Err(service_error("ResourceNotFoundException", "Rule not found")),
        }
    }

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> ProviderResult<()> {
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .get_mut(arn)
            .ok_or_else(|| service_error("ResourceNotFoundException", "Rule not found"))?;
        rule.tags.extend(tags.clone());
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> ProviderResult<()> {
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .get_mut(arn)
            .ok_or_else(|| service_error("ResourceNotFoundException", "Rule not found"))?;
        for key in keys {
            rule.tags.remove(key);
        }
        Ok(())
    }

    async fn delete_target(&self, address: &str) -> ProviderResult<()> {
        let attempt = {
            let mut deleted = self.deleted_targets.lock().unwrap();
            deleted.push(address.to_string());
            deleted.len()
        };
        if attempt <= self.throttle_target_deletes {
            return Err(service_error("ThrottlingException", "Rate exceeded"));
        }

        let subscribed = self.external_subscriptions.contains(address)
            || self
                .rules
                .lock()
                .unwrap()
                .values()
                .any(|r| r.target.iter().any(|t| t.address == address));
        if subscribed {
            return Err(service_error("ValidationException", TARGET_SUBSCRIBED_MESSAGE));
        }

        self.targets.lock().unwrap().remove(address);
        Ok(())
    }
}

/// SSO Admin returning fixed instances, `page_size` per page
pub struct FakeSsoAdmin {
    pub instances: Vec<SsoInstance>,
    pub page_size: usize,
}

impl FakeSsoAdmin {
    pub fn with_instances(count: usize) -> Self {
        Self {
            instances: (0..count)
                .map(|i| SsoInstance {
                    arn: format!("arn:aws:sso:::instance/ssoins-{:04}", i),
                    identity_store_id: format!("d-{:04}", i),
                })
                .collect(),
            page_size: 1,
        }
    }
}

#[async_trait]
impl SsoAdminApi for FakeSsoAdmin {
    async fn list_instances(&self, next_token: Option<String>) -> ProviderResult<InstancePage> {
        let start: usize = match next_token {
            Some(token) => token
                .parse()
                .map_err(|_| service_error("ValidationException", "Invalid NextToken"))?,
            None => 0,
        };
        let end = (start + self.page_size).min(self.instances.len());
        Ok(InstancePage {
            instances: self.instances[start..end].to_vec(),
            next_token: (end < self.instances.len()).then(|| end.to_string()),
        })
    }
}
