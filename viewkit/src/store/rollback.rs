use log::debug;

use crate::patch::apply_merge_patch;
use crate::{Error, View, ViewStore};

/// Restores a view to the state recorded by the revision with the given
/// version, and saves the result through the given store.
///
/// The stored diff is applied to the *current* document only. Rolling back
/// across several revisions at once is therefore exact only when the
/// intervening changes don't overlap in ways that merge patches can't
/// express (e.g. partial array edits or explicit nulls).
///
/// Exactly one revision is recorded: the one produced by
/// [`ViewStore::save`]. If the restored document equals the current one,
/// nothing is recorded at all.
pub fn rollback<S>(store: &S, name: &str, version: u64) -> Result<View, Error>
where
    S: ViewStore + ?Sized,
{
    let current = store.load(name)?;
    let revision = current
        .metadata
        .revision(version)
        .ok_or_else(|| Error::RevisionNotFound(name.to_string(), version))?;
    let patch = serde_json::from_str(&revision.diff).map_err(|e| {
        Error::InvalidPatch(format!(
            "revision {} of view \"{}\" has a malformed diff: {}",
            version, name, e
        ))
    })?;

    let mut doc = serde_json::to_value(&current)?;
    apply_merge_patch(&mut doc, &patch);
    let mut candidate: View = serde_json::from_value(doc).map_err(|e| {
        Error::InvalidPatch(format!(
            "applying revision {} of view \"{}\" produced an invalid view: {}",
            version, name, e
        ))
    })?;
    candidate.name = current.name;

    debug!("Rolling back view {} to version {}", name, version);
    store.save(name, candidate)
}
