//! Version bookkeeping owned by the store.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// The versioning envelope of a view.
///
/// Only the store writes metadata. Whatever metadata a caller attaches to a
/// view passed to [`crate::ViewStore::save`] is discarded in favour of the
/// persisted one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "_v")]
    pub version: u64,
    #[serde(rename = "_t")]
    pub total: u64,
    /// Append-only, oldest first.
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Timestamp,
}

impl Metadata {
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            version: 0,
            total: 0,
            revisions: Vec::new(),
            updated_at: created_at.clone(),
            created_at,
        }
    }

    /// Find the revision recorded while the view was at the given version.
    pub fn revision(&self, version: u64) -> Option<&Revision> {
        self.revisions.iter().find(|rev| rev.version == version)
    }

    /// The most recently recorded revision.
    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revisions.last()
    }
}

/// One entry in a view's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// The version the view was at *before* the change this revision undoes.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub timestamp: Timestamp,
    /// A JSON merge patch that, applied to the document written by the
    /// change, yields the document as it was before the change.
    #[serde(default)]
    pub diff: String,
}
