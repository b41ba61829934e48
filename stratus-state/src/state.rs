//! State file structures for persisting reconciled state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stratus_core::resource::{self, ResourceId, State};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Stratus that last modified this state
    pub stratus_version: String,
    /// All managed resources, ordered by type and name
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            stratus_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and update the tool version for a new state write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.stratus_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Find a resource by type and name
    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.id() == *id)
    }

    /// Record an existing resource, replacing any earlier entry
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        let id = resource.id();
        match self.resources.iter_mut().find(|r| r.id() == id) {
            Some(existing) => *existing = resource,
            None => {
                self.resources.push(resource);
                self.resources.sort_by_key(ResourceState::id);
            }
        }
    }

    /// Remove a resource from the state
    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.id() == *id)?;
        Some(self.resources.remove(pos))
    }

    /// Record the outcome of reading or writing `state`
    ///
    /// A state that no longer exists removes the entry.
    pub fn record(&mut self, state: &State, provider: &str) {
        match ResourceState::from_state(state, provider) {
            Some(resource) => self.upsert_resource(resource),
            None => {
                self.remove_resource(&state.id);
            }
        }
    }

    /// Every stored resource as a core [`State`], keyed by id
    pub fn states(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| (r.id(), r.to_state()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "codestarnotifications.notification_rule")
    pub resource_type: String,
    /// Resource name from configuration
    pub name: String,
    /// Provider name (e.g., "aws")
    pub provider: String,
    /// Identifier assigned by the remote system (e.g., an ARN)
    pub identifier: String,
    /// Last observed attributes
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceState {
    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    /// Convert a core state; `None` if it does not exist remotely
    pub fn from_state(state: &State, provider: &str) -> Option<Self> {
        if !state.exists {
            return None;
        }
        let identifier = state.identifier.clone()?;
        let attributes = match resource::attributes_to_json(&state.attributes) {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Some(Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            provider: provider.to_string(),
            identifier,
            attributes,
        })
    }

    pub fn to_state(&self) -> State {
        let attributes =
            resource::attributes_from_json(&serde_json::Value::Object(self.attributes.clone()));
        State::existing(self.id(), self.identifier.clone(), attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::resource::Value;

    fn rule_state(name: &str, status: &str) -> State {
        State::existing(
            ResourceId::new("codestarnotifications.notification_rule", name),
            format!("arn:aws:codestar-notifications:us-east-1:123456789012:notificationrule/{}", name),
            [("status".to_string(), Value::String(status.to_string()))]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_state_file_new() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_state_file_increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn record_replaces_existing_entry() {
        let mut file = StateFile::new();
        file.record(&rule_state("builds", "ENABLED"), "aws");
        file.record(&rule_state("builds", "DISABLED"), "aws");

        assert_eq!(file.resources.len(), 1);
        assert_eq!(
            file.resources[0].attributes.get("status"),
            Some(&serde_json::json!("DISABLED"))
        );
    }

    #[test]
    fn record_of_missing_resource_removes_it() {
        let mut file = StateFile::new();
        let state = rule_state("builds", "ENABLED");
        file.record(&state, "aws");

        file.record(&State::not_found(state.id.clone()), "aws");
        assert!(file.find_resource(&state.id).is_none());
    }

    #[test]
    fn resources_stay_sorted() {
        let mut file = StateFile::new();
        file.record(&rule_state("b", "ENABLED"), "aws");
        file.record(&rule_state("a", "ENABLED"), "aws");
        let names: Vec<&str> = file.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn states_round_trip_through_file() {
        let mut file = StateFile::new();
        let state = rule_state("builds", "ENABLED");
        file.record(&state, "aws");

        let json = serde_json::to_string_pretty(&file).unwrap();
        let read: StateFile = serde_json::from_str(&json).unwrap();
        assert_eq!(read.lineage, file.lineage);
        assert_eq!(read.states().get(&state.id), Some(&state));
    }
}
