//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in configuration with the "current
//! state" fetched from the Provider, and generates a list of required
//! Effects (Plan). Changes to force-new attributes become replacements, so
//! an in-place update never sees one.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::effect::Effect;
use crate::error::ProviderResult;
use crate::plan::Plan;
use crate::provider::Provider;
use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> needs delete and create
    Replace {
        from: State,
        to: Resource,
        replace_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

/// Find changed attributes between two attribute maps, in name order
///
/// An attribute present on one side only counts as changed.
pub fn changed_attributes(old: &Attributes, new: &Attributes) -> Vec<String> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter(|key| old.get(*key) != new.get(*key))
        .cloned()
        .collect()
}

/// Classify the changes between `from` and `to` given the changed attributes
pub fn classify(
    schema: &ResourceSchema,
    from: &State,
    to: &Resource,
    changed: Vec<String>,
) -> Diff {
    if changed.is_empty() {
        return Diff::NoChange(to.id.clone());
    }

    let replace_attributes = schema.replacement_attributes(&changed);
    if replace_attributes.is_empty() {
        Diff::Update {
            from: from.clone(),
            to: to.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            from: from.clone(),
            to: to.clone(),
            replace_attributes,
        }
    }
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Resources in `current_states` that are no longer desired are deleted.
pub fn create_plan<P: Provider + ?Sized>(
    provider: &P,
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
) -> ProviderResult<Plan> {
    let mut plan = Plan::new();

    for resource in desired {
        if resource.is_data_source() {
            plan.add(Effect::Read(resource.clone()));
            continue;
        }

        let diff = match current_states.get(&resource.id) {
            Some(current) if current.exists => provider.diff(current, resource)?,
            _ => Diff::Create(resource.clone()),
        };

        match diff {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                from,
                to,
                changed_attributes,
            }),
            Diff::Replace {
                from,
                to,
                replace_attributes,
            } => plan.add(Effect::Replace {
                from,
                to,
                replace_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    let desired_ids: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !desired_ids.contains(&s.id))
        .collect();
    orphans.sort_by(|a, b| a.id.cmp(&b.id));
    for state in orphans {
        plan.add(Effect::Delete(state.clone()));
    }

    Ok(plan)
}
