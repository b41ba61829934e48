//! Effect - A single side effect to be applied
//!
//! Effects are plain values; nothing happens until the driver applies them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read a data source
    Read(Resource),
    Create(Resource),
    Update {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Delete then create, because a force-new attribute changed
    Replace {
        from: State,
        to: Resource,
        replace_attributes: Vec<String>,
    },
    Delete(State),
}

impl Effect {
    /// Whether this Effect changes remote state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { to, .. } | Effect::Replace { to, .. } => &to.id,
            Effect::Delete(state) => &state.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Read(_) => "read",
            Effect::Create(_) => "create",
            Effect::Update { .. } => "update",
            Effect::Replace { .. } => "replace",
            Effect::Delete(_) => "delete",
        }
    }
}
