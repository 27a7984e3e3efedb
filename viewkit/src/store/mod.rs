//! Persistence of views.

mod local;
mod rollback;

use std::path::PathBuf;

use crate::{Error, Lens, Timestamp, View};

pub use local::LocalStore;
pub use rollback::rollback;

/// A contract for persisting and retrieving views, along with the binary
/// assets backing their lenses.
///
/// All methods operate on a view identified by its name. Implementations are
/// meant for a single writer: concurrent mutations of the same view may lose
/// updates.
pub trait ViewStore {
    /// Persists a new, empty view at version 0.
    fn create(&self, name: &str, timestamp: Timestamp) -> Result<View, Error>;

    /// Returns the last saved state of the view with the given name.
    fn load(&self, name: &str) -> Result<View, Error>;

    /// Returns all persisted views. Entries that cannot be read are skipped.
    fn list(&self) -> Result<Vec<View>, Error>;

    /// Persists the given state of an existing view, recording a revision
    /// that undoes the change. The view's metadata is always derived from
    /// the persisted state, never taken from `view`.
    ///
    /// Returns the view as written.
    fn save(&self, name: &str, view: View) -> Result<View, Error>;

    /// Irrecoverably removes the view and all of its assets.
    fn delete(&self, name: &str) -> Result<(), Error>;

    /// Stores the module backing the lens with the given label, returning its
    /// location. The module is validated before anything is written.
    fn upload_asset(&self, name: &str, label: &str, module: &[u8]) -> Result<PathBuf, Error>;

    /// Removes the module backing the lens with the given label. Succeeds if
    /// there is no such module.
    fn delete_asset(&self, name: &str, label: &str) -> Result<(), Error>;

    /// Returns the base64-encoded module backing the given lens of the view.
    fn asset_blob(&self, name: &str, label: &str) -> Result<String, Error>;

    /// Resolves the location of the module backing the given lens.
    fn asset_path(&self, name: &str, lens: &Lens) -> PathBuf;

    /// Restores the state recorded by the revision with the given version.
    /// The rollback is itself saved as a new revision.
    fn rollback(&self, name: &str, version: u64) -> Result<View, Error> {
        rollback(self, name, version)
    }
}
