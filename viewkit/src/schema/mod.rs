//! Management of the schema that view queries are validated against.
//!
//! The schema is made up of two parts: a default schema that ships with
//! Viewkit, and a custom schema holding user-defined types.

mod validate;

use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;

use crate::fs::{ensure_path_exists, maybe_read, write_atomic};
use crate::Error;

pub use validate::{validate_query, validate_sdl, Schema, BUILTIN_SCALARS};

/// The schema written to a fresh schema store.
pub const DEFAULT_SCHEMA: &str = include_str!("default_schema.graphql");

const DEFAULT_SCHEMA_FILE: &str = "default_schema.graphql";
const CUSTOM_SCHEMA_FILE: &str = "custom_schema.graphql";

/// Storage for the default and custom schemas.
pub trait SchemaStore {
    /// The default and custom schemas combined.
    fn load(&self) -> Result<String, Error> {
        Ok(format!("{}\n\n{}", self.load_default()?, self.load_custom()?))
    }

    fn load_default(&self) -> Result<String, Error>;

    fn load_custom(&self) -> Result<String, Error>;

    /// Replaces the entire custom schema.
    fn save_custom(&self, schema: &str) -> Result<(), Error>;

    /// Removes all user-defined types.
    fn reset_custom(&self) -> Result<(), Error> {
        self.save_custom("")
    }

    /// Names of the types in the default and custom schemas, respectively.
    fn list_types(&self) -> Result<(Vec<String>, Vec<String>), Error> {
        Ok((
            type_names(&self.load_default()?),
            type_names(&self.load_custom()?),
        ))
    }

    /// The full definition of the type with the given name, searched for in
    /// the default schema first.
    fn type_definition(&self, name: &str) -> Result<String, Error> {
        for schema in [self.load_default()?, self.load_custom()?] {
            if let Some(def) = find_type_block(&schema, name) {
                return Ok(def);
            }
        }
        Err(Error::NoSuchSchemaType(name.to_string()))
    }

    /// Appends a single type definition to the custom schema. The
    /// definition must be valid in the context of the combined schema and
    /// must not redefine an existing type.
    fn add_custom_type(&self, block: &str) -> Result<String, Error> {
        let block = block.trim();
        let names = type_names(block);
        let name = match names.as_slice() {
            [name] => name.clone(),
            _ => {
                return Err(Error::InvalidSdl(
                    "exactly one 'type <Name> { ... }' definition is expected".to_string(),
                ))
            }
        };
        let combined = self.load()?;
        if type_names(&combined).contains(&name) {
            return Err(Error::SchemaTypeAlreadyExists(name));
        }
        Schema::parse(&format!("{}\n\n{}", combined, block))?;
        let custom = self.load_custom()?;
        let custom = if custom.trim().is_empty() {
            block.to_string()
        } else {
            format!("{}\n\n{}", custom.trim_end(), block)
        };
        self.save_custom(&custom)?;
        debug!("Added custom schema type {}", name);
        Ok(name)
    }

    /// Removes the type with the given name from the custom schema.
    fn remove_custom_type(&self, name: &str) -> Result<(), Error> {
        let custom = self.load_custom()?;
        let re = type_block_regex(name, true);
        if !re.is_match(&custom) {
            return Err(Error::NoSuchSchemaType(name.to_string()));
        }
        let remaining = re.replace_all(&custom, "");
        self.save_custom(remaining.trim())?;
        debug!("Removed custom schema type {}", name);
        Ok(())
    }
}

/// A [`SchemaStore`] keeping both schemas as files in a directory.
#[derive(Debug, Clone)]
pub struct FileSchemaStore {
    base_path: PathBuf,
}

impl FileSchemaStore {
    /// Opens the schema store in the given directory, seeding the default
    /// schema if it's missing or empty.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, Error> {
        Self::with_default(base_path, DEFAULT_SCHEMA)
    }

    /// Like [`FileSchemaStore::new`], but seeds the given default schema.
    pub fn with_default<P, S>(base_path: P, default_schema: S) -> Result<Self, Error>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let store = Self {
            base_path: base_path.as_ref().to_path_buf(),
        };
        ensure_path_exists(&store.base_path)?;
        if store.load_default()?.trim().is_empty() {
            write_atomic(
                store.path(DEFAULT_SCHEMA_FILE),
                format!("{}\n", default_schema.as_ref().trim()),
            )?;
            debug!("Seeded default schema in {}", store.base_path.display());
        }
        Ok(store)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }

    fn read(&self, file: &str) -> Result<String, Error> {
        Ok(maybe_read(self.path(file))?
            .map(|content| String::from_utf8_lossy(&content).into_owned())
            .unwrap_or_default())
    }
}

impl SchemaStore for FileSchemaStore {
    fn load_default(&self) -> Result<String, Error> {
        self.read(DEFAULT_SCHEMA_FILE)
    }

    fn load_custom(&self) -> Result<String, Error> {
        self.read(CUSTOM_SCHEMA_FILE)
    }

    fn save_custom(&self, schema: &str) -> Result<(), Error> {
        let schema = schema.trim();
        let content = if schema.is_empty() {
            String::new()
        } else {
            format!("{}\n", schema)
        };
        write_atomic(self.path(CUSTOM_SCHEMA_FILE), content)
    }
}

fn type_names(schema: &str) -> Vec<String> {
    // The pattern is a constant and known to be valid.
    let re = Regex::new(r"(?:^|[\s}])type\s+(\w+)").unwrap();
    re.captures_iter(schema)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn type_block_regex(name: &str, trailing_newlines: bool) -> Regex {
    let pattern = format!(
        r"(?ms)^\s*type\s+{}\b[^{{]*\{{[^}}]*\}}{}",
        regex::escape(name),
        if trailing_newlines { r"\n*" } else { "" }
    );
    // Only the escaped type name varies, so the pattern is always valid.
    Regex::new(&pattern).unwrap()
}

fn find_type_block(schema: &str, name: &str) -> Option<String> {
    type_block_regex(name, false)
        .find(schema)
        .map(|m| m.as_str().trim().to_string())
}
