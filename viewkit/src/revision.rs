//! Computation of reverse diffs between successive states of a view.
//!
//! This is the only place where version numbers are minted.

use log::trace;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::patch::{create_merge_patch, is_empty_patch};
use crate::{Error, Metadata, Revision, Timestamp};

/// Records the transition from `old` to `new` in the given metadata.
///
/// The recorded diff is a merge patch that takes `new` back to `old`. If the
/// two states serialize identically, the metadata is returned unchanged.
/// Otherwise a revision keyed by the current version is appended, and both
/// `version` and `total` are incremented.
pub fn record_revision<O, N>(
    mut meta: Metadata,
    old: &O,
    new: &N,
    now: Timestamp,
) -> Result<Metadata, Error>
where
    O: Serialize,
    N: Serialize,
{
    let old_json = serde_json::to_value(old)?;
    let new_json = serde_json::to_value(new)?;
    let patch = reverse_patch(&old_json, &new_json);
    if is_empty_patch(&patch) {
        trace!("No changes detected at version {}", meta.version);
        return Ok(meta);
    }
    let diff = serde_json::to_string(&patch)?;
    trace!("Recording revision {}: {}", meta.version, diff);
    meta.revisions.push(Revision {
        version: meta.version,
        timestamp: now.clone(),
        diff,
    });
    meta.version += 1;
    meta.total += 1;
    meta.updated_at = now;
    Ok(meta)
}

/// The merge patch that turns `new` back into `old`.
pub fn reverse_patch(old: &JsonValue, new: &JsonValue) -> JsonValue {
    create_merge_patch(new, old)
}
