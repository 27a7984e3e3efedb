//! High-level operations on views, as exposed by the command line interface.
//!
//! These combine the stores with validation: by the time a view reaches
//! [`ViewStore::save`], its query, schema definition and lens modules have
//! all been checked.

use eyre::Result;
use log::info;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::fetch::fetch_module;
use crate::schema::{validate_query, validate_sdl};
use crate::wasm::validate_module;
use crate::{Error, Lens, SchemaStore, Timestamp, View, ViewStore};

/// Creates a new, empty view.
pub fn init_view<S: ViewStore + ?Sized>(store: &S, name: &str) -> Result<View> {
    let view = store.create(name, Timestamp::now())?;
    info!("Initialized view {}", name);
    Ok(view)
}

pub fn inspect_view<S: ViewStore + ?Sized>(store: &S, name: &str) -> Result<View> {
    Ok(store.load(name)?)
}

pub fn list_views<S: ViewStore + ?Sized>(store: &S) -> Result<Vec<View>> {
    Ok(store.list()?)
}

pub fn delete_view<S: ViewStore + ?Sized>(store: &S, name: &str) -> Result<()> {
    store.delete(name)?;
    info!("Deleted view {}", name);
    Ok(())
}

/// Sets the query of the given view after validating it against the
/// combined default and custom schemas.
pub fn update_query<S, C>(store: &S, schemas: &C, name: &str, query: &str) -> Result<View>
where
    S: ViewStore + ?Sized,
    C: SchemaStore + ?Sized,
{
    let mut view = store.load(name)?;
    validate_query(&schemas.load()?, query)?;
    view.query = Some(query.to_string());
    Ok(store.save(name, view)?)
}

/// Sets the schema definition of the given view after validating it.
pub fn update_sdl<S: ViewStore + ?Sized>(store: &S, name: &str, sdl: &str) -> Result<View> {
    let mut view = store.load(name)?;
    validate_sdl(sdl)?;
    view.sdl = Some(sdl.to_string());
    Ok(store.save(name, view)?)
}

pub fn clear_query<S: ViewStore + ?Sized>(store: &S, name: &str) -> Result<View> {
    let mut view = store.load(name)?;
    view.query = None;
    Ok(store.save(name, view)?)
}

pub fn clear_sdl<S: ViewStore + ?Sized>(store: &S, name: &str) -> Result<View> {
    let mut view = store.load(name)?;
    view.sdl = None;
    Ok(store.save(name, view)?)
}

/// Appends a lens backed by the given module to the view's transform.
///
/// Nothing is written if the label is already taken or the module is not a
/// WebAssembly binary.
pub fn add_lens<S: ViewStore + ?Sized>(
    store: &S,
    name: &str,
    label: &str,
    module: &[u8],
    arguments: Map<String, JsonValue>,
) -> Result<View> {
    let mut view = store.load(name)?;
    if view.transform.contains(label) {
        return Err(Error::LensAlreadyExists(name.to_string(), label.to_string()).into());
    }
    validate_module(module)?;
    store.upload_asset(name, label, module)?;
    view.transform.push(name, Lens::new(label, arguments))?;
    let view = store.save(name, view)?;
    info!("Added lens {} to view {}", label, name);
    Ok(view)
}

/// Like [`add_lens`], but downloads the module from the given URL first.
pub fn add_lens_from_url<S: ViewStore + ?Sized>(
    store: &S,
    name: &str,
    label: &str,
    url: &str,
    arguments: Map<String, JsonValue>,
) -> Result<View> {
    if store.load(name)?.transform.contains(label) {
        return Err(Error::LensAlreadyExists(name.to_string(), label.to_string()).into());
    }
    let module = fetch_module(url)?;
    add_lens(store, name, label, &module, arguments)
}

/// Removes the lens with the given label, along with its module.
pub fn remove_lens<S: ViewStore + ?Sized>(store: &S, name: &str, label: &str) -> Result<View> {
    let mut view = store.load(name)?;
    if view.transform.remove(label).is_none() {
        return Err(Error::NoSuchLens(name.to_string(), label.to_string()).into());
    }
    store.delete_asset(name, label)?;
    let view = store.save(name, view)?;
    info!("Removed lens {} from view {}", label, name);
    Ok(view)
}

/// Rolls the view back to the given version, or undoes the most recent
/// change if no version is given.
pub fn rollback<S: ViewStore + ?Sized>(store: &S, name: &str, version: Option<u64>) -> Result<View> {
    let version = match version {
        Some(v) => v,
        None => store
            .load(name)?
            .metadata
            .latest_revision()
            .map(|rev| rev.version)
            .ok_or_else(|| Error::NoRevisions(name.to_string()))?,
    };
    let view = store.rollback(name, version)?;
    info!(
        "Rolled back view {} to version {} (now at version {})",
        name, version, view.metadata.version
    );
    Ok(view)
}

/// The form in which a view is handed over to an execution environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedView {
    #[serde(rename = "Query")]
    pub query: String,
    #[serde(rename = "SDL")]
    pub sdl: String,
    #[serde(rename = "Transform")]
    pub transform: ExportedTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedTransform {
    pub lenses: Vec<ExportedLens>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedLens {
    pub path: String,
    pub arguments: Map<String, JsonValue>,
}

/// Builds the export payload of the given view, with lens modules referenced
/// by absolute path.
pub fn export_view<S: ViewStore + ?Sized>(store: &S, name: &str) -> Result<ExportedView> {
    let view = store.load(name)?;
    let lenses = view
        .transform
        .lenses
        .iter()
        .map(|lens| ExportedLens {
            path: store.asset_path(name, lens).display().to_string(),
            arguments: lens.arguments.clone(),
        })
        .collect();
    Ok(ExportedView {
        query: view.query.unwrap_or_default(),
        sdl: view.sdl.unwrap_or_default(),
        transform: ExportedTransform { lenses },
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fetch::test::serve_once;
    use crate::{FileSchemaStore, LocalStore};
    use serde_json::json;
    use tempfile::TempDir;

    const MODULE: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

    struct Fixture {
        _dir: TempDir,
        views: LocalStore,
        schemas: FileSchemaStore,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let views = LocalStore::new(dir.path().join("views")).unwrap();
        let schemas = FileSchemaStore::new(dir.path().join("schema")).unwrap();
        Fixture {
            _dir: dir,
            views,
            schemas,
        }
    }

    fn error_of(report: eyre::Report) -> Error {
        match report.downcast::<Error>() {
            Ok(e) => e,
            Err(report) => panic!("unexpected error type: {:?}", report),
        }
    }

    #[test]
    fn view_crud() {
        let f = fixture();
        init_view(&f.views, "testview").unwrap();
        assert_eq!(inspect_view(&f.views, "testview").unwrap().name, "testview");

        f.schemas
            .add_custom_type("type TempLog { address: String }")
            .unwrap();
        let view = update_query(&f.views, &f.schemas, "testview", "TempLog { address }").unwrap();
        assert_eq!(view.query.as_deref(), Some("TempLog { address }"));

        let sdl = "type Something @materialized(if: false) { x: String }";
        let view = update_sdl(&f.views, "testview", sdl).unwrap();
        assert_eq!(view.sdl.as_deref(), Some(sdl));

        let view = clear_query(&f.views, "testview").unwrap();
        assert_eq!(view.query, None);
        let view = clear_sdl(&f.views, "testview").unwrap();
        assert_eq!(view.sdl, None);
        assert_eq!(view.metadata.version, 4);

        assert_eq!(list_views(&f.views).unwrap().len(), 1);
        delete_view(&f.views, "testview").unwrap();
        assert!(matches!(
            error_of(inspect_view(&f.views, "testview").unwrap_err()),
            Error::NoSuchView(_)
        ));
    }

    #[test]
    fn invalid_edits_never_reach_the_store() {
        let f = fixture();
        init_view(&f.views, "v").unwrap();
        assert!(matches!(
            error_of(update_query(&f.views, &f.schemas, "v", "Nope { x }").unwrap_err()),
            Error::InvalidQuery(_)
        ));
        assert!(matches!(
            error_of(update_sdl(&f.views, "v", "type A { b: Missing }").unwrap_err()),
            Error::InvalidSdl(_)
        ));
        assert_eq!(f.views.load("v").unwrap().metadata.version, 0);
    }

    #[test]
    fn lens_lifecycle() {
        let f = fixture();
        init_view(&f.views, "lensview").unwrap();

        let view = add_lens(
            &f.views,
            "lensview",
            "x",
            &MODULE,
            json!({"arg": "val"}).as_object().unwrap().clone(),
        )
        .unwrap();
        assert_eq!(view.transform.len(), 1);
        assert_eq!(view.transform.lenses[0].label, "x");
        let asset = f.views.asset_path("lensview", &view.transform.lenses[0]);
        assert!(asset.is_file());

        let err = add_lens(&f.views, "lensview", "x", &MODULE, Map::new()).unwrap_err();
        assert!(matches!(error_of(err), Error::LensAlreadyExists(_, _)));
        assert_eq!(f.views.load("lensview").unwrap(), view);

        let view = remove_lens(&f.views, "lensview", "x").unwrap();
        assert!(view.transform.is_empty());
        assert!(!asset.exists());

        let err = remove_lens(&f.views, "lensview", "x").unwrap_err();
        assert!(matches!(error_of(err), Error::NoSuchLens(_, _)));
    }

    #[test]
    fn invalid_modules_leave_the_view_alone() {
        let f = fixture();
        let created = init_view(&f.views, "v").unwrap();
        let err = add_lens(&f.views, "v", "x", b"\x7fELF\x02\x01\x01\x00", Map::new()).unwrap_err();
        assert!(matches!(error_of(err), Error::InvalidModule(_)));
        assert_eq!(f.views.load("v").unwrap(), created);
    }

    #[test]
    fn lenses_from_urls() {
        let f = fixture();
        let created = init_view(&f.views, "remote").unwrap();

        let url = serve_once("500 Internal Server Error", b"");
        let err = add_lens_from_url(&f.views, "remote", "x", &url, Map::new()).unwrap_err();
        assert!(matches!(error_of(err), Error::UnexpectedStatus(_, 500)));
        assert_eq!(f.views.load("remote").unwrap(), created);

        let url = serve_once("200 OK", b"not wasm");
        let err = add_lens_from_url(&f.views, "remote", "x", &url, Map::new()).unwrap_err();
        assert!(matches!(error_of(err), Error::InvalidModule(_)));
        assert_eq!(f.views.load("remote").unwrap(), created);

        let url = serve_once("200 OK", &MODULE);
        let view = add_lens_from_url(&f.views, "remote", "x", &url, Map::new()).unwrap();
        assert_eq!(view.transform.lenses[0].label, "x");
        assert_eq!(f.views.asset_blob("remote", "x").unwrap(), "AGFzbQEAAAA=");
    }

    #[test]
    fn rollback_defaults_to_latest_revision() {
        let f = fixture();
        init_view(&f.views, "a").unwrap();
        assert!(matches!(
            error_of(rollback(&f.views, "a", None).unwrap_err()),
            Error::NoRevisions(_)
        ));
        update_query(&f.views, &f.schemas, "a", "Log { address }").unwrap();
        update_query(&f.views, &f.schemas, "a", "Log { address topics }").unwrap();

        let view = rollback(&f.views, "a", None).unwrap();
        assert_eq!(view.query.as_deref(), Some("Log { address }"));
        assert_eq!(view.metadata.version, 3);

        let view = rollback(&f.views, "a", Some(0)).unwrap();
        assert_eq!(view.query, None);
        assert_eq!(view.metadata.version, 4);
    }

    #[test]
    fn export_payload() {
        let f = fixture();
        init_view(&f.views, "a").unwrap();
        update_query(&f.views, &f.schemas, "a", "Log { address }").unwrap();
        add_lens(
            &f.views,
            "a",
            "filter",
            &MODULE,
            json!({"src": "address"}).as_object().unwrap().clone(),
        )
        .unwrap();

        let exported = export_view(&f.views, "a").unwrap();
        assert_eq!(exported.query, "Log { address }");
        assert_eq!(exported.sdl, "");
        let path = f.views.base_path().join("a").join("assets").join("filter.wasm");
        assert_eq!(
            serde_json::to_value(&exported).unwrap(),
            json!({
                "Query": "Log { address }",
                "SDL": "",
                "Transform": {
                    "lenses": [{
                        "path": path.display().to_string(),
                        "arguments": {"src": "address"}
                    }]
                }
            })
        );
    }
}
