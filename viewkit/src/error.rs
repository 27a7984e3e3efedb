use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced by Viewkit.
#[derive(Debug, Error)]
pub enum Error {
    #[error("view \"{0}\" already exists")]
    ViewAlreadyExists(String),
    #[error("view \"{0}\" does not exist")]
    NoSuchView(String),
    #[error("version {1} not found in the history of view \"{0}\"")]
    RevisionNotFound(String, u64),
    #[error("view \"{0}\" has no revisions to roll back to")]
    NoRevisions(String),
    #[error("lens with label \"{1}\" already exists in view \"{0}\"")]
    LensAlreadyExists(String, String),
    #[error("lens with label \"{1}\" not found in view \"{0}\"")]
    NoSuchLens(String, String),
    #[error("asset for lens \"{1}\" of view \"{0}\" not found at {2}")]
    NoSuchAsset(String, String, PathBuf),
    #[error("invalid name \"{0}\": names may only contain ASCII letters, digits, '-', '_' and '.'")]
    InvalidName(String),
    #[error("invalid WebAssembly module: {0}")]
    InvalidModule(String),
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid SDL: {0}")]
    InvalidSdl(String),
    #[error("type \"{0}\" already exists in the schema")]
    SchemaTypeAlreadyExists(String),
    #[error("type \"{0}\" not found in the schema")]
    NoSuchSchemaType(String),
    #[error("failed to fetch {0}: {1}")]
    Fetch(String, String),
    #[error("unexpected HTTP status {1} while fetching {0}")]
    UnexpectedStatus(String, u16),
    #[error("cannot determine file type of file: {0}")]
    CannotDetermineFileType(PathBuf),
}

impl Error {
    /// Wraps an I/O error with a short description of what was being
    /// attempted.
    pub fn io<S: AsRef<str>>(context: S, e: std::io::Error) -> Self {
        Self::Io(context.as_ref().to_string(), e)
    }

    /// Whether this error signals that something the caller asked for is not
    /// there (view, revision, lens or asset).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSuchView(_)
                | Self::RevisionNotFound(_, _)
                | Self::NoRevisions(_)
                | Self::NoSuchLens(_, _)
                | Self::NoSuchAsset(_, _, _)
                | Self::NoSuchSchemaType(_)
        )
    }
}
