//! Stratus AWS Provider
//!
//! CodeStar notification rules and the SSO instance lookup, registered
//! behind a single [`ProviderRegistry`] named "aws".

pub mod codestarnotifications;
pub mod config;
pub mod error;
pub mod notification_rule;
pub mod sso_instance;
pub mod ssoadmin;
#[cfg(test)]
mod testing;

use aws_config::{BehaviorVersion, Region};
use stratus_core::reconciler::{DataReader, Reconciler};
use stratus_core::registry::ProviderRegistry;

use crate::codestarnotifications::{NotificationsApi, SdkNotificationsClient};
pub use crate::config::ProviderConfig;
use crate::notification_rule::NotificationRuleProvider;
use crate::sso_instance::SsoInstanceSource;
use crate::ssoadmin::{SdkSsoAdminClient, SsoAdminApi};

/// Build the AWS provider from SDK clients loaded with `config`
pub async fn load(config: &ProviderConfig) -> ProviderRegistry {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;
    log::debug!(
        "AWS provider region: {}",
        sdk_config.region().map(|r| r.as_ref()).unwrap_or("<unset>")
    );

    registry(
        SdkNotificationsClient::new(aws_sdk_codestarnotifications::Client::new(&sdk_config)),
        SdkSsoAdminClient::new(aws_sdk_ssoadmin::Client::new(&sdk_config)),
        config,
    )
}

/// Build the AWS provider from any API implementations
pub fn registry<N, S>(notifications: N, sso_admin: S, config: &ProviderConfig) -> ProviderRegistry
where
    N: NotificationsApi + 'static,
    S: SsoAdminApi + 'static,
{
    ProviderRegistry::new("aws")
        .register(
            Reconciler::new(NotificationRuleProvider::new(notifications))
                .with_cleanup_policy(config.cleanup_policy()),
        )
        .register(DataReader::new(SsoInstanceSource::new(sso_admin)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNotifications, FakeSsoAdmin};
    use std::collections::HashMap;
    use stratus_core::differ::create_plan;
    use stratus_core::interpreter::Interpreter;
    use stratus_core::provider::Provider;
    use stratus_core::resource::{Resource, Value};

    fn provider() -> ProviderRegistry {
        registry(
            FakeNotifications::default(),
            FakeSsoAdmin::with_instances(1),
            &ProviderConfig::default(),
        )
    }

    #[test]
    fn registers_both_types() {
        assert_eq!(
            provider().resource_types(),
            vec![
                "codestarnotifications.notification_rule",
                "ssoadmin.instance"
            ]
        );
        assert_eq!(provider().name(), "aws");
    }

    #[tokio::test]
    async fn plan_and_apply_rule_with_data_source() {
        let interpreter = Interpreter::new(provider());
        let rule = Resource::new(notification_rule::RESOURCE_TYPE, "builds")
            .with_attribute("name", Value::String("builds".to_string()))
            .with_attribute("detail_type", Value::String("FULL".to_string()))
            .with_attribute(
                "event_type_ids",
                Value::List(vec![Value::String(
                    "codebuild-project-build-state-failed".to_string(),
                )]),
            )
            .with_attribute(
                "resource",
                Value::String("arn:aws:codebuild:us-east-1:123456789012:project/app".to_string()),
            );
        let instance = Resource::new(sso_instance::DATA_SOURCE_TYPE, "main").with_read_only(true);
        let desired = vec![instance, rule];

        let mut states = HashMap::new();
        let plan = create_plan(interpreter.provider(), &desired, &states).unwrap();
        assert_eq!(plan.summary().read, 1);
        assert_eq!(plan.summary().create, 1);

        let result = interpreter.apply(&plan).await;
        assert!(result.is_success());
        result.apply_to(&mut states);
        assert_eq!(states.len(), 1);

        let plan = create_plan(interpreter.provider(), &desired, &states).unwrap();
        assert!(plan.is_empty());
    }
}
