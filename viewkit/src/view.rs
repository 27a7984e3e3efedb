//! The view document and its transform pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{Error, Metadata, Timestamp};

/// A view is a named document made up of a query, a schema fragment and an
/// ordered pipeline of lenses, along with its version history.
///
/// The JSON representation of a view is exactly what gets persisted:
///
/// ```json
/// {
///   "name": "example",
///   "query": "Log { address }",
///   "sdl": null,
///   "transform": { "lenses": [] },
///   "metadata": { "_v": 1, "_t": 1, "revisions": [...], "createdAt": "...", "updatedAt": "..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    // "Never set" and "cleared" are both `None`, but the key is always
    // written so that the document shape stays stable.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sdl: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub metadata: Metadata,
}

impl View {
    /// An empty view at version 0.
    pub fn new<N: AsRef<str>>(name: N, created_at: Timestamp) -> Self {
        Self {
            name: name.as_ref().to_string(),
            query: None,
            sdl: None,
            transform: Transform::default(),
            metadata: Metadata::new(created_at),
        }
    }

    /// Get the lens with the given label, if any.
    pub fn lens<L: AsRef<str>>(&self, label: L) -> Option<&Lens> {
        self.transform.get(label)
    }
}

/// The ordered list of lenses applied to a view's query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub lenses: Vec<Lens>,
}

impl Transform {
    pub fn get<L: AsRef<str>>(&self, label: L) -> Option<&Lens> {
        let label = label.as_ref();
        self.lenses.iter().find(|lens| lens.label == label)
    }

    pub fn contains<L: AsRef<str>>(&self, label: L) -> bool {
        self.get(label).is_some()
    }

    /// Appends the given lens to the end of the pipeline. Fails if a lens
    /// with the same label is already present.
    pub fn push(&mut self, view_name: &str, lens: Lens) -> Result<(), Error> {
        if self.contains(&lens.label) {
            return Err(Error::LensAlreadyExists(
                view_name.to_string(),
                lens.label,
            ));
        }
        self.lenses.push(lens);
        Ok(())
    }

    /// Removes the lens with the given label, returning it if it was present.
    pub fn remove<L: AsRef<str>>(&mut self, label: L) -> Option<Lens> {
        let label = label.as_ref();
        let idx = self.lenses.iter().position(|lens| lens.label == label)?;
        Some(self.lenses.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.lenses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lenses.len()
    }
}

/// A single transform step, backed by a WebAssembly module stored in the
/// view's asset area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    pub label: String,
    /// Locator of the module, relative to the view's directory unless
    /// absolute.
    pub path: String,
    #[serde(default)]
    pub arguments: Map<String, JsonValue>,
}

impl Lens {
    /// Constructs a lens whose module lives at the conventional location in
    /// the view's asset area.
    pub fn new<L: AsRef<str>>(label: L, arguments: Map<String, JsonValue>) -> Self {
        let label = label.as_ref().to_string();
        Self {
            path: asset_locator(&label),
            label,
            arguments,
        }
    }
}

/// The relative locator of the module backing the lens with the given label.
pub fn asset_locator(label: &str) -> String {
    format!("{}/{}.{}", ASSETS_DIR, label, ASSET_EXTENSION)
}

pub(crate) const ASSETS_DIR: &str = "assets";
pub(crate) const ASSET_EXTENSION: &str = "wasm";

/// Names of views and labels of lenses end up as path components, so they're
/// restricted to a conservative character set.
pub fn validate_name<N: AsRef<str>>(name: N) -> Result<(), Error> {
    let name = name.as_ref();
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Revision;
    use serde_json::json;

    #[test]
    fn empty_view_serialization() {
        let view = View::new("the-good-view", Timestamp::from("1749746283"));
        let expected = r#"{"name":"the-good-view","query":null,"sdl":null,"transform":{"lenses":[]},"metadata":{"_v":0,"_t":0,"revisions":[],"createdAt":"1749746283","updatedAt":"1749746283"}}"#;
        assert_eq!(serde_json::to_string(&view).unwrap(), expected);
    }

    #[test]
    fn full_view_deserialization() {
        let doc = json!({
            "name": "example",
            "query": "Log {address topics data transactionHash blockNumber}",
            "sdl": "type FilteredLogs @materialized(if: false) {hash: String}",
            "transform": {
                "lenses": [{
                    "label": "filter_usdt",
                    "path": "assets/filter_usdt.wasm",
                    "arguments": {
                        "src": "address",
                        "value": "0xdac17f958d2ee523a2206206994597c13d831ec7"
                    }
                }]
            },
            "metadata": {
                "_v": 2,
                "_t": 2,
                "revisions": [{"version": 0, "timestamp": "1749748820", "diff": "{\"query\":null}"}],
                "createdAt": "1749746283",
                "updatedAt": "1749748820"
            }
        });
        let view: View = serde_json::from_value(doc).unwrap();
        assert_eq!(view.name, "example");
        assert_eq!(view.transform.len(), 1);
        assert_eq!(view.lens("filter_usdt").unwrap().arguments["src"], "address");
        assert_eq!(view.metadata.version, 2);
        assert_eq!(
            view.metadata.revisions,
            vec![Revision {
                version: 0,
                timestamp: Timestamp::from("1749748820"),
                diff: r#"{"query":null}"#.to_string(),
            }]
        );
    }

    #[test]
    fn missing_nullable_fields_deserialize_as_none() {
        let view: View = serde_json::from_str(r#"{"name":"a","transform":{"lenses":[]}}"#).unwrap();
        assert_eq!(view.query, None);
        assert_eq!(view.sdl, None);
        assert_eq!(view.metadata.version, 0);
    }

    #[test]
    fn duplicate_lens_labels_are_rejected() {
        let mut transform = Transform::default();
        transform.push("v", Lens::new("x", Map::new())).unwrap();
        let err = transform.push("v", Lens::new("x", Map::new())).unwrap_err();
        assert!(matches!(err, Error::LensAlreadyExists(_, label) if label == "x"));
        assert_eq!(transform.len(), 1);
        assert_eq!(transform.lenses[0].path, "assets/x.wasm");
        assert!(transform.remove("x").is_some());
        assert!(transform.remove("x").is_none());
    }

    #[test]
    fn name_validation() {
        for name in ["a", "my-view", "view_2", "v1.2"] {
            validate_name(name).unwrap();
        }
        for name in ["", ".", "..", "a/b", "a\\b", "with space"] {
            assert!(validate_name(name).is_err(), "{:?} should be invalid", name);
        }
    }
}
