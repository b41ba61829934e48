//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.

use std::collections::HashMap;

use crate::effect::Effect;
use crate::error::{ProviderError, ProviderResult};
use crate::plan::Plan;
use crate::provider::Provider;
use crate::resource::{ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Old object deleted and new one created
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { id: ResourceId, reason: String },
}

impl EffectOutcome {
    /// State to record for the resource, if any
    pub fn state(&self) -> Option<&State> {
        match self {
            EffectOutcome::Read { state }
            | EffectOutcome::Created { state }
            | EffectOutcome::Updated { state }
            | EffectOutcome::Replaced { state } => Some(state),
            EffectOutcome::Deleted { .. } | EffectOutcome::Skipped { .. } => None,
        }
    }
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }

    /// Fold successful outcomes into `states`
    ///
    /// Data source reads are not persisted.
    pub fn apply_to(&self, states: &mut HashMap<ResourceId, State>) {
        for outcome in self.outcomes.iter().flatten() {
            match outcome {
                EffectOutcome::Created { state }
                | EffectOutcome::Updated { state }
                | EffectOutcome::Replaced { state } => {
                    states.insert(state.id.clone(), state.clone());
                }
                EffectOutcome::Deleted { id } => {
                    states.remove(id);
                }
                EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => {}
            }
        }
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&self, plan: &Plan) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            log::info!("{} {}", effect.kind(), effect.resource_id());
            let result = self.execute(effect).await;

            match &result {
                Ok(_) => success_count += 1,
                Err(e) => {
                    log::error!("{}", e);
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Re-read every stored resource, dropping those deleted out of band
    pub async fn refresh(
        &self,
        states: &HashMap<ResourceId, State>,
    ) -> ProviderResult<HashMap<ResourceId, State>> {
        let mut refreshed = HashMap::new();
        let mut ids: Vec<&ResourceId> = states.keys().collect();
        ids.sort();

        for id in ids {
            let Some(identifier) = states[id].identifier.as_deref() else {
                log::warn!("{} has no identifier, dropping it", id);
                continue;
            };
            let state = self.provider.read(id, identifier).await?;
            if state.exists {
                refreshed.insert(id.clone(), state);
            }
        }

        Ok(refreshed)
    }

    /// Execute a single Effect
    pub async fn execute(&self, effect: &Effect) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                id: effect.resource_id().clone(),
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read(resource) => {
                let state = self.provider.read_data(resource).await?;
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let state = self.provider.create(resource).await?;
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { from, to, .. } => {
                let state = self.provider.update(from, to).await?;
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { from, to, .. } => {
                self.provider.delete(from).await?;
                let state = self.provider.create(to).await?;
                Ok(EffectOutcome::Replaced { state })
            }
            Effect::Delete(state) => {
                self.provider.delete(state).await?;
                Ok(EffectOutcome::Deleted {
                    id: state.id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::create_plan;
    use crate::reconciler::Reconciler;
    use crate::reconciler::tests::FakeRules;
    use crate::resource::{Resource, Value};

    fn rule(name: &str, status: &str) -> Resource {
        Resource::new("rule", name)
            .with_attribute("name", Value::String(name.to_string()))
            .with_attribute("status", Value::String(status.to_string()))
    }

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(Reconciler::new(FakeRules::default()));
        let plan = Plan::new();
        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn converges_then_plans_nothing() {
        let interpreter = Interpreter::new(Reconciler::new(FakeRules::default()));
        let desired = vec![rule("a", "ENABLED"), rule("b", "DISABLED")];
        let mut states = HashMap::new();

        let plan = create_plan(interpreter.provider(), &desired, &states).unwrap();
        assert_eq!(plan.summary().create, 2);
        let result = interpreter.apply(&plan).await;
        assert!(result.is_success());
        result.apply_to(&mut states);
        assert_eq!(states.len(), 2);

        let plan = create_plan(interpreter.provider(), &desired, &states).unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn removed_resource_is_deleted() {
        let interpreter = Interpreter::new(Reconciler::new(FakeRules::default()));
        let mut states = HashMap::new();

        let plan = create_plan(interpreter.provider(), &[rule("a", "ENABLED")], &states).unwrap();
        interpreter.apply(&plan).await.apply_to(&mut states);

        let plan = create_plan(interpreter.provider(), &[], &states).unwrap();
        assert_eq!(plan.summary().delete, 1);
        interpreter.apply(&plan).await.apply_to(&mut states);
        assert!(states.is_empty());
        assert!(interpreter.provider().provider().rules.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_drops_out_of_band_deletions() {
        let interpreter = Interpreter::new(Reconciler::new(FakeRules::default()));
        let mut states = HashMap::new();
        let plan = create_plan(
            interpreter.provider(),
            &[rule("a", "ENABLED"), rule("b", "ENABLED")],
            &states,
        )
        .unwrap();
        interpreter.apply(&plan).await.apply_to(&mut states);

        let gone = states[&ResourceId::new("rule", "a")].identifier.clone().unwrap();
        interpreter.provider().provider().rules.lock().unwrap().remove(&gone);

        let refreshed = interpreter.refresh(&states).await.unwrap();
        assert_eq!(refreshed.len(), 1);
        assert!(refreshed.contains_key(&ResourceId::new("rule", "b")));
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(Reconciler::new(FakeRules::default())).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(rule("a", "ENABLED")));

        let result = interpreter.apply(&plan).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
        assert!(interpreter.provider().provider().rules.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let interpreter = Interpreter::new(Reconciler::new(FakeRules::default()));
        let mut plan = Plan::new();
        plan.add(Effect::Create(rule("a", "PAUSED")));
        plan.add(Effect::Create(rule("b", "ENABLED")));

        let result = interpreter.apply(&plan).await;
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.outcomes.len(), 1);
    }
}
