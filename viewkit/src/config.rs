//! Configuration-related functionality for Viewkit.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fs::maybe_canonicalize;
use crate::{Error, FileSchemaStore, LocalStore};

const VIEWS_DIR: &str = "views";
const SCHEMA_DIR: &str = "schema";

/// Viewkit configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// The directory under which views and schemas are stored.
    pub root: PathBuf,
    /// Optional file whose content seeds the default schema, instead of the
    /// built-in one.
    pub default_schema: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            root: home.join(".viewkit"),
            default_schema: None,
        }
    }
}

impl Config {
    /// Loads configuration from the given JSON or YAML file if it exists,
    /// otherwise returns the default configuration.
    pub fn load<P: AsRef<Path>>(maybe_config_file: P) -> Result<Self, Error> {
        let maybe_config_file = maybe_config_file.as_ref();
        match maybe_canonicalize(maybe_config_file)? {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                debug!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => {
                debug!(
                    "No such configuration file, using defaults: {}",
                    maybe_config_file.display()
                );
                Ok(Self::default())
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::CannotDetermineFileType(path.to_path_buf()))?;
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        match ext {
            "json" => Ok(serde_json::from_str(&content)?),
            "yml" | "yaml" => Ok(serde_yaml::from_str(&content)?),
            _ => Err(Error::CannotDetermineFileType(path.to_path_buf())),
        }
    }

    /// Overrides the storage root.
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn views_path(&self) -> PathBuf {
        self.root.join(VIEWS_DIR)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.root.join(SCHEMA_DIR)
    }

    /// Opens the view store described by this configuration.
    pub fn view_store(&self) -> Result<LocalStore, Error> {
        LocalStore::new(self.views_path())
    }

    /// Opens the schema store described by this configuration.
    pub fn schema_store(&self) -> Result<FileSchemaStore, Error> {
        match &self.default_schema {
            Some(path) => {
                let default_schema = fs::read_to_string(path)
                    .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
                FileSchemaStore::with_default(self.schema_path(), default_schema)
            }
            None => FileSchemaStore::new(self.schema_path()),
        }
    }
}
