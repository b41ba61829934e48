//! Stratus Core
//!
//! Core library for declarative resource reconciliation: typed providers,
//! the lifecycle state machine, dependent cleanup and plan execution

pub mod cleanup;
pub mod differ;
pub mod effect;
pub mod error;
pub mod finder;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod resource;
pub mod retry;
pub mod schema;
