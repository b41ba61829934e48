//! Configuration file loading

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use stratus_core::resource::{Resource, ResourceId, Value};
use stratus_provider_aws::ProviderConfig;

/// A configuration file: provider settings, managed resources and data sources
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub resources: Vec<Block>,
    #[serde(default)]
    pub data: Vec<Block>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    fn to_resource(&self, read_only: bool) -> Result<Resource, String> {
        let mut resource = Resource::new(&self.resource_type, &self.name).with_read_only(read_only);
        for (key, value) in &self.attributes {
            let value = Value::from_json_strict(value)
                .map_err(|e| format!("{}.{}: {}", resource.id, key, e))?;
            if let Some(value) = value {
                resource = resource.with_attribute(key.clone(), value);
            }
        }
        Ok(resource)
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))
    }

    /// Data sources first, then managed resources, in file order
    ///
    /// Fails if two blocks share a type and name.
    pub fn desired(&self) -> Result<Vec<Resource>, String> {
        let mut seen: HashSet<ResourceId> = HashSet::new();
        let mut desired = Vec::new();

        let blocks = self
            .data
            .iter()
            .map(|b| (b, true))
            .chain(self.resources.iter().map(|b| (b, false)));
        for (block, read_only) in blocks {
            let resource = block.to_resource(read_only)?;
            if !seen.insert(resource.id.clone()) {
                return Err(format!("Duplicate declaration of {}", resource.id));
            }
            desired.push(resource);
        }

        Ok(desired)
    }
}
