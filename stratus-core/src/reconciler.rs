//! Reconciler - The Create/Read/Update/Delete state machine
//!
//! [`Reconciler`] wraps a typed [`ResourceProvider`] and enforces the
//! lifecycle contract every resource obeys:
//!
//! - Create stores the remote identifier and reads back. A not-found on that
//!   read is an error, since the object was just created.
//! - Read reports a missing object as [`ReadOutcome::Absent`] so the driver
//!   drops it from state (drift), instead of failing.
//! - Update refuses force-new changes, issues the remote update only when
//!   something changed, and cleans up dependents only after it succeeded.
//! - Delete tolerates an already-missing object and always cleans up every
//!   dependent, through the same cleanup path as Update.

use std::collections::BTreeSet;

use crate::cleanup::{self, CleanupReport};
use crate::differ::{self, Diff};
use crate::error::{ErrorKind, Operation, ProviderError, ProviderResult};
use crate::finder;
use crate::provider::{BoxFuture, DataSource, Provider, ResourceProvider};
use crate::resource::{self, Attributes, Resource, ResourceId, State};
use crate::retry::RetryPolicy;
use crate::schema::ResourceSchema;

/// Observed state together with its remote identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<T> {
    pub identifier: String,
    pub observed: T,
}

/// Result of reading a resource that may have been deleted out of band
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Present(Observation<T>),
    /// The remote object is gone; the caller must drop its local state
    Absent,
}

impl<T> ReadOutcome<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }
}

/// Lifecycle driver for one resource type
pub struct Reconciler<P> {
    provider: P,
    cleanup_policy: RetryPolicy,
}

impl<P: ResourceProvider> Reconciler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cleanup_policy: RetryPolicy::default(),
        }
    }

    /// Retry policy for dependent sub-object cleanup
    pub fn with_cleanup_policy(mut self, policy: RetryPolicy) -> Self {
        self.cleanup_policy = policy;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate untyped desired state against the schema and decode it
    pub fn desired(&self, resource: &Resource) -> ProviderResult<P::Desired> {
        let schema = self.provider.schema();
        schema
            .validate(&resource.attributes)
            .map_err(|errors| ProviderError::from_type_errors(&resource.id, &errors))?;

        let attributes = schema.apply_defaults(&resource.attributes);
        resource::decode(&attributes).map_err(|e| {
            ProviderError::validation(format!("invalid desired state: {}", e))
                .for_resource(resource.id.clone())
        })
    }

    /// Create the remote object and read it back
    pub async fn create(&self, desired: &P::Desired) -> ProviderResult<Observation<P::Observed>> {
        let identifier = self
            .provider
            .create(desired)
            .await
            .map_err(|e| e.during(Operation::Create, None))?;
        log::debug!("created {} {}", self.provider.type_name(), identifier);

        self.read_after_write(&identifier, Operation::Create).await
    }

    /// Read the remote object, reporting out-of-band deletion as `Absent`
    pub async fn read(&self, identifier: &str) -> ProviderResult<ReadOutcome<P::Observed>> {
        match self.find(identifier).await? {
            Some(observed) => Ok(ReadOutcome::Present(Observation {
                identifier: identifier.to_string(),
                observed,
            })),
            None => {
                log::warn!(
                    "{} ({}) not found, removing from state",
                    self.provider.type_name(),
                    identifier
                );
                Ok(ReadOutcome::Absent)
            }
        }
    }

    /// Update in place from the observed state to `new`
    pub async fn update(
        &self,
        identifier: &str,
        current: &P::Observed,
        new: &P::Desired,
    ) -> ProviderResult<Observation<P::Observed>> {
        let old = self.provider.desired_of(current);
        let changed = differ::changed_attributes(&self.encode(&old)?, &self.encode(new)?);

        if changed.is_empty() {
            return Ok(Observation {
                identifier: identifier.to_string(),
                observed: current.clone(),
            });
        }

        let replace = self.provider.schema().replacement_attributes(&changed);
        if !replace.is_empty() {
            return Err(ProviderError::validation(format!(
                "changing {} requires replacement",
                replace.join(", ")
            ))
            .during(Operation::Update, Some(identifier)));
        }

        log::debug!(
            "updating {} {} ({})",
            self.provider.type_name(),
            identifier,
            changed.join(", ")
        );
        self.provider
            .update(identifier, &old, new)
            .await
            .map_err(|e| e.during(Operation::Update, Some(identifier)))?;

        let old_dependents = self.provider.dependents(&old);
        let new_dependents = self.provider.dependents(new);
        if old_dependents != new_dependents {
            self.cleanup(identifier, &old_dependents, Some(&new_dependents))
                .await
                .map_err(|e| e.during(Operation::Update, Some(identifier)))?;
        }

        self.read_after_write(identifier, Operation::Update).await
    }

    /// Delete the remote object and every dependent it referenced
    pub async fn delete(&self, identifier: &str, current: &P::Observed) -> ProviderResult<()> {
        match self.provider.delete(identifier).await {
            Ok(()) => log::debug!("deleted {} {}", self.provider.type_name(), identifier),
            Err(e) if e.is_not_found() => {
                log::debug!(
                    "{} {} already deleted",
                    self.provider.type_name(),
                    identifier
                );
            }
            Err(e) => return Err(e.during(Operation::Delete, Some(identifier))),
        }

        let dependents = self.provider.dependents(&self.provider.desired_of(current));
        self.cleanup(identifier, &dependents, None)
            .await
            .map_err(|e| e.during(Operation::Delete, Some(identifier)))?;
        Ok(())
    }

    /// Seed state from an existing remote identifier without creating anything
    pub async fn import(&self, identifier: &str) -> ProviderResult<Observation<P::Observed>> {
        let observed = self.find(identifier).await?;
        let observed = finder::require(observed, identifier)
            .map_err(|e| e.during(Operation::Import, Some(identifier)))?;
        Ok(Observation {
            identifier: identifier.to_string(),
            observed,
        })
    }

    async fn find(&self, identifier: &str) -> ProviderResult<Option<P::Observed>> {
        finder::lookup(self.provider.find(identifier).await)
            .map_err(|e| e.during(Operation::Read, Some(identifier)))
    }

    async fn read_after_write(
        &self,
        identifier: &str,
        operation: Operation,
    ) -> ProviderResult<Observation<P::Observed>> {
        let observed = self.find(identifier).await?;
        let observed = finder::require(observed, identifier).map_err(|e| {
            ProviderError {
                message: format!("{} right after {}", e.message, operation),
                ..e
            }
            .during(Operation::Read, Some(identifier))
        })?;
        Ok(Observation {
            identifier: identifier.to_string(),
            observed,
        })
    }

    async fn cleanup(
        &self,
        identifier: &str,
        old: &BTreeSet<String>,
        new: Option<&BTreeSet<String>>,
    ) -> ProviderResult<CleanupReport> {
        let provider = &self.provider;
        let report = cleanup::cleanup(old, new, &self.cleanup_policy, |key| async move {
            provider.delete_dependent(&key).await
        })
        .await?;

        if !report.retained.is_empty() {
            log::debug!(
                "{} {}: kept {} dependent(s) still in use elsewhere",
                provider.type_name(),
                identifier,
                report.retained.len()
            );
        }
        Ok(report)
    }

    fn encode<T: serde::Serialize>(&self, typed: &T) -> ProviderResult<Attributes> {
        resource::encode(typed)
            .map_err(|e| ProviderError::new("failed to encode state").with_cause(e))
    }

    fn to_state(&self, id: &ResourceId, observation: Observation<P::Observed>) -> ProviderResult<State> {
        let attributes = self
            .encode(&observation.observed)
            .map_err(|e| e.for_resource(id.clone()))?;
        Ok(State::existing(id.clone(), observation.identifier, attributes))
    }

    fn from_state(&self, state: &State) -> ProviderResult<(String, P::Observed)> {
        let identifier = state.identifier.clone().ok_or_else(|| {
            ProviderError::new("resource has no remote identifier").for_resource(state.id.clone())
        })?;
        let observed = resource::decode(&state.attributes).map_err(|e| {
            ProviderError::new("stored state does not match the resource schema")
                .with_cause(e)
                .for_resource(state.id.clone())
        })?;
        Ok((identifier, observed))
    }

    fn schema_for(&self, resource_type: &str) -> ProviderResult<ResourceSchema> {
        let schema = self.provider.schema();
        if schema.resource_type == resource_type {
            Ok(schema)
        } else {
            Err(ProviderError::new(format!(
                "Unknown resource type: {}",
                resource_type
            )))
        }
    }
}

impl<P: ResourceProvider> Provider for Reconciler<P> {
    fn name(&self) -> &'static str {
        self.provider.type_name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        vec![self.provider.schema()]
    }

    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        self.desired(resource).map(|_| ())
    }

    fn diff(&self, current: &State, desired: &Resource) -> ProviderResult<Diff> {
        let schema = self.schema_for(&desired.id.resource_type)?;
        let new = self.desired(desired)?;
        let (_, observed) = self.from_state(current)?;
        let old = self.provider.desired_of(&observed);

        let changed = differ::changed_attributes(&self.encode(&old)?, &self.encode(&new)?);
        Ok(differ::classify(&schema, current, desired, changed))
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match self
                .read(&identifier)
                .await
                .map_err(|e| e.for_resource(id.clone()))?
            {
                ReadOutcome::Present(observation) => self.to_state(&id, observation),
                ReadOutcome::Absent => Ok(State::not_found(id)),
            }
        })
    }

    fn read_data(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let id = resource.id.clone();
        Box::pin(async move {
            Err(ProviderError::validation("not a data source").for_resource(id))
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let desired = self.desired(&resource)?;
            let observation = self
                .create(&desired)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))?;
            self.to_state(&resource.id, observation)
        })
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            let desired = self.desired(&to)?;
            let (identifier, observed) = self.from_state(&from)?;
            let observation = self
                .update(&identifier, &observed, &desired)
                .await
                .map_err(|e| e.for_resource(to.id.clone()))?;
            self.to_state(&to.id, observation)
        })
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let current = current.clone();
        Box::pin(async move {
            let (identifier, observed) = self.from_state(&current)?;
            self.delete(&identifier, &observed)
                .await
                .map_err(|e| e.for_resource(current.id.clone()))
        })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            self.schema_for(&id.resource_type)?;
            let observation = self
                .import(&identifier)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;
            self.to_state(&id, observation)
        })
    }
}

/// Adapter exposing a typed [`DataSource`] through [`Provider`]
pub struct DataReader<D> {
    source: D,
}

impl<D: DataSource> DataReader<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    fn args(&self, resource: &Resource) -> ProviderResult<D::Args> {
        let schema = self.source.schema();
        schema
            .validate(&resource.attributes)
            .map_err(|errors| ProviderError::from_type_errors(&resource.id, &errors))?;
        resource::decode(&schema.apply_defaults(&resource.attributes)).map_err(|e| {
            ProviderError::validation(format!("invalid arguments: {}", e))
                .for_resource(resource.id.clone())
        })
    }

    fn read_only(&self, id: &ResourceId) -> ProviderError {
        ProviderError::with_kind(
            ErrorKind::Validation,
            format!("{} is a data source and cannot be managed", self.source.type_name()),
        )
        .for_resource(id.clone())
    }
}

impl<D: DataSource> Provider for DataReader<D> {
    fn name(&self) -> &'static str {
        self.source.type_name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        vec![self.source.schema()]
    }

    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        self.args(resource).map(|_| ())
    }

    fn diff(&self, _current: &State, desired: &Resource) -> ProviderResult<Diff> {
        Err(self.read_only(&desired.id))
    }

    fn read(&self, id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let err = self.read_only(id);
        Box::pin(async move { Err(err) })
    }

    fn read_data(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let args = self.args(&resource)?;
            let (identifier, observed) = self
                .source
                .read(&args)
                .await
                .map_err(|e| e.during(Operation::Read, None).for_resource(resource.id.clone()))?;
            let attributes = resource::encode(&observed).map_err(|e| {
                ProviderError::new("failed to encode state")
                    .with_cause(e)
                    .for_resource(resource.id.clone())
            })?;
            Ok(State::existing(resource.id.clone(), identifier, attributes))
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let err = self.read_only(&resource.id);
        Box::pin(async move { Err(err) })
    }

    fn update(&self, _from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let err = self.read_only(&to.id);
        Box::pin(async move { Err(err) })
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let err = self.read_only(&current.id);
        Box::pin(async move { Err(err) })
    }

    fn import(&self, id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let err = self.read_only(id);
        Box::pin(async move { Err(err) })
    }
}
