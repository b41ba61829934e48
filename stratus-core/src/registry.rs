//! Registry - Route resource types to their providers

use std::collections::HashMap;
use std::sync::Arc;

use crate::differ::Diff;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, Provider};
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// A [`Provider`] that dispatches on `resource_type`
pub struct ProviderRegistry {
    name: &'static str,
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            providers: HashMap::new(),
        }
    }

    /// Register a provider for every type it has a schema for
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register<P: Provider + 'static>(mut self, provider: P) -> Self {
        let provider: Arc<dyn Provider> = Arc::new(provider);
        for schema in provider.schemas() {
            self.providers
                .insert(schema.resource_type.clone(), provider.clone());
        }
        self
    }

    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        types.sort();
        types
    }

    fn get(&self, resource_type: &str) -> ProviderResult<&dyn Provider> {
        self.providers
            .get(resource_type)
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                ProviderError::validation(format!("Unknown resource type: {}", resource_type))
            })
    }
}

fn unknown<T: Send + 'static>(
    result: ProviderResult<T>,
) -> BoxFuture<'static, ProviderResult<T>> {
    Box::pin(async move { result })
}

impl Provider for ProviderRegistry {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        let mut schemas: Vec<ResourceSchema> = self
            .providers
            .iter()
            .flat_map(|(ty, p)| p.schemas().into_iter().filter(move |s| &s.resource_type == ty))
            .collect();
        schemas.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        schemas
    }

    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        self.get(&resource.id.resource_type)
            .map_err(|e| e.for_resource(resource.id.clone()))?
            .validate(resource)
    }

    fn diff(&self, current: &State, desired: &Resource) -> ProviderResult<Diff> {
        self.get(&desired.id.resource_type)
            .map_err(|e| e.for_resource(desired.id.clone()))?
            .diff(current, desired)
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        match self.get(&id.resource_type) {
            Ok(p) => p.read(id, identifier),
            Err(e) => unknown(Err(e.for_resource(id.clone()))),
        }
    }

    fn read_data(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        match self.get(&resource.id.resource_type) {
            Ok(p) => p.read_data(resource),
            Err(e) => unknown(Err(e.for_resource(resource.id.clone()))),
        }
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        match self.get(&resource.id.resource_type) {
            Ok(p) => p.create(resource),
            Err(e) => unknown(Err(e.for_resource(resource.id.clone()))),
        }
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        match self.get(&to.id.resource_type) {
            Ok(p) => p.update(from, to),
            Err(e) => unknown(Err(e.for_resource(to.id.clone()))),
        }
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        match self.get(&current.id.resource_type) {
            Ok(p) => p.delete(current),
            Err(e) => unknown(Err(e.for_resource(current.id.clone()))),
        }
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        match self.get(&id.resource_type) {
            Ok(p) => p.import(id, identifier),
            Err(e) => unknown(Err(e.for_resource(id.clone()))),
        }
    }
}
