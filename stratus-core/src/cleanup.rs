//! Cleanup - Best-effort removal of dependent sub-objects
//!
//! Some remote systems create sub-objects implicitly on first reference (for
//! example notification targets) and never garbage-collect them. When a
//! resource stops referencing one, or is deleted, the sub-object has to be
//! removed explicitly. The remote system does not reference-count them, so a
//! removal may fail because another owner still uses the sub-object. That
//! outcome is permanent and counts as success here.

use std::collections::BTreeSet;
use std::future::Future;

use crate::error::{ErrorKind, Operation, ProviderError, ProviderResult};
use crate::retry::RetryPolicy;

/// Outcome of a successful cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Sub-objects removed (or already gone)
    pub deleted: Vec<String>,
    /// Sub-objects left in place because another owner references them
    pub retained: Vec<String>,
}

impl CleanupReport {
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.retained.len()
    }
}

/// Sub-objects referenced by `old` but not by `new`
///
/// `None` means the owner is going away entirely, so everything in `old` is
/// removed.
pub fn removed_keys(old: &BTreeSet<String>, new: Option<&BTreeSet<String>>) -> BTreeSet<String> {
    match new {
        Some(new) => old.difference(new).cloned().collect(),
        None => old.clone(),
    }
}

/// Delete every sub-object in `old - new`
///
/// Each deletion is retried under `policy` unless it fails as
/// `StillReferenced` (kept, reported as retained) or `NotFound` (already
/// gone). Any other error that outlives the retry budget stops the loop:
/// the remaining keys are not attempted and nothing is rolled back.
pub async fn cleanup<F, Fut>(
    old: &BTreeSet<String>,
    new: Option<&BTreeSet<String>>,
    policy: &RetryPolicy,
    mut delete: F,
) -> ProviderResult<CleanupReport>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ProviderResult<()>>,
{
    let removed = removed_keys(old, new);
    let mut report = CleanupReport::default();

    for key in &removed {
        let result = policy
            .retry(
                || delete(key.clone()),
                |e| !matches!(e.kind, ErrorKind::StillReferenced | ErrorKind::NotFound),
            )
            .await;

        match result {
            Ok(()) => {
                log::debug!("removed sub-object {}", key);
                report.deleted.push(key.clone());
            }
            Err(e) if e.is_not_found() => {
                log::debug!("sub-object {} already gone", key);
                report.deleted.push(key.clone());
            }
            Err(e) if e.is_still_referenced() => {
                log::debug!("sub-object {} still referenced elsewhere, keeping it", key);
                report.retained.push(key.clone());
            }
            Err(e) => {
                let message = format!(
                    "{} (stopped after {} of {} sub-objects)",
                    e.message,
                    report.attempted(),
                    removed.len()
                );
                return Err(ProviderError {
                    message,
                    ..e.during(Operation::Cleanup, Some(key))
                });
            }
        }
    }

    Ok(report)
}
