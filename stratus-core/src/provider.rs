//! Provider - Traits abstracting resource operations
//!
//! There are two layers. Resource implementations are written against the
//! statically typed [`ResourceProvider`] and [`DataSource`] traits, one per
//! resource type, with explicit mapping to and from the remote API. The
//! driver talks to the type-erased [`Provider`] trait, which moves untyped
//! [`Resource`] and [`State`] values and is implemented by
//! [`Reconciler`](crate::reconciler::Reconciler),
//! [`DataReader`](crate::reconciler::DataReader) and
//! [`ProviderRegistry`](crate::registry::ProviderRegistry).

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::differ::Diff;
use crate::error::ProviderResult;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle operations of one managed resource type
///
/// Implementations issue remote calls only. Existence classification,
/// drift handling, replacement checks and dependent cleanup are layered on
/// top by [`Reconciler`](crate::reconciler::Reconciler).
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Statically typed desired state
    type Desired: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync;
    /// Statically typed observed state, produced only by `find`
    type Observed: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Resource type name (e.g., "codestarnotifications.notification_rule")
    fn type_name(&self) -> &'static str;

    /// Field schema, validation rules and defaults
    fn schema(&self) -> ResourceSchema;

    /// Project observed state onto the desired-state shape, dropping
    /// computed fields
    fn desired_of(&self, observed: &Self::Observed) -> Self::Desired;

    /// Keys of the dependent sub-objects referenced by `state`
    fn dependents(&self, _state: &Self::Desired) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Create the remote object and return the identifier it was assigned
    async fn create(&self, desired: &Self::Desired) -> ProviderResult<String>;

    /// Read the remote object once. Absence is `Ok(None)`.
    async fn find(&self, identifier: &str) -> ProviderResult<Option<Self::Observed>>;

    /// Apply an in-place update from `old` to `new`
    async fn update(
        &self,
        identifier: &str,
        old: &Self::Desired,
        new: &Self::Desired,
    ) -> ProviderResult<()>;

    /// Delete the remote object
    async fn delete(&self, identifier: &str) -> ProviderResult<()>;

    /// Delete one dependent sub-object
    async fn delete_dependent(&self, _key: &str) -> ProviderResult<()> {
        Ok(())
    }
}

/// A read-only lookup
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Arguments decoded from configuration
    type Args: DeserializeOwned + Send + Sync;
    type Observed: Serialize + Send + Sync;

    /// Data source type name (e.g., "ssoadmin.instance")
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Returns the identifier and the observed state
    async fn read(&self, args: &Self::Args) -> ProviderResult<(String, Self::Observed)>;
}

/// Type-erased provider used by the driver
///
/// Each infrastructure provider (AWS, ...) exposes this trait.
/// All remote operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Schemas of every resource and data source type this Provider handles
    fn schemas(&self) -> Vec<ResourceSchema>;

    /// Validate desired state locally, without any remote call
    fn validate(&self, resource: &Resource) -> ProviderResult<()>;

    /// Compare desired state with the last observed state
    fn diff(&self, current: &State, desired: &Resource) -> ProviderResult<Diff>;

    /// Get the current state of a resource
    ///
    /// Returns `State::not_found()` if the resource no longer exists.
    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Read a data source
    fn read_data(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote identifier (e.g., an ARN)
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>>;

    /// Seed state from a pre-existing remote identifier
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        (**self).schemas()
    }

    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        (**self).validate(resource)
    }

    fn diff(&self, current: &State, desired: &Resource) -> ProviderResult<Diff> {
        (**self).diff(current, desired)
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier)
    }

    fn read_data(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read_data(resource)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(from, to)
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(current)
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}
