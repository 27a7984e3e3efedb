use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use subtle_encoding::base64;

use crate::fs::{ensure_path_exists, maybe_read, write_atomic};
use crate::hash::sha256;
use crate::revision::record_revision;
use crate::view::{validate_name, ASSETS_DIR, ASSET_EXTENSION};
use crate::wasm::validate_module;
use crate::{Error, Lens, Timestamp, View, ViewStore};

const VIEW_FILE: &str = "view.json";

/// A [`ViewStore`] backed by a directory on the local file system.
///
/// Each view gets its own directory, named after the view:
///
/// ```text
/// <base>/
///   <name>/
///     view.json
///     assets/
///       <label>.wasm
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Opens the store rooted at the given directory, creating it if
    /// necessary.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, Error> {
        let base_path = base_path.as_ref().to_path_buf();
        ensure_path_exists(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn view_dir(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    fn view_file(&self, name: &str) -> PathBuf {
        self.view_dir(name).join(VIEW_FILE)
    }

    fn assets_dir(&self, name: &str) -> PathBuf {
        self.view_dir(name).join(ASSETS_DIR)
    }

    fn asset_file(&self, name: &str, label: &str) -> PathBuf {
        self.assets_dir(name)
            .join(format!("{}.{}", label, ASSET_EXTENSION))
    }

    // A view exists once its document has been written. A directory without
    // a document is the remnant of an interrupted `create`.
    fn exists(&self, name: &str) -> bool {
        self.view_file(name).is_file()
    }

    fn ensure_exists(&self, name: &str) -> Result<(), Error> {
        validate_name(name)?;
        if self.exists(name) {
            Ok(())
        } else {
            Err(Error::NoSuchView(name.to_string()))
        }
    }

    fn write_view(&self, view: &View) -> Result<(), Error> {
        let content = serde_json::to_vec_pretty(view)?;
        write_atomic(self.view_file(&view.name), content)
    }

    fn read_view(path: &Path) -> Result<View, Error> {
        let content =
            fs::read(path).map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_slice(&content)?)
    }
}

impl ViewStore for LocalStore {
    fn create(&self, name: &str, timestamp: Timestamp) -> Result<View, Error> {
        validate_name(name)?;
        if self.exists(name) {
            return Err(Error::ViewAlreadyExists(name.to_string()));
        }
        ensure_path_exists(&self.assets_dir(name))?;
        let view = View::new(name, timestamp);
        self.write_view(&view)?;
        debug!("Created view {} in {}", name, self.view_dir(name).display());
        Ok(view)
    }

    fn load(&self, name: &str) -> Result<View, Error> {
        self.ensure_exists(name)?;
        Self::read_view(&self.view_file(name))
    }

    fn list(&self) -> Result<Vec<View>, Error> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| Error::io(format!("listing {}", self.base_path.display()), e))?;
        let mut views = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", self.base_path.display(), e);
                    continue;
                }
            };
            let path = entry.path().join(VIEW_FILE);
            if !path.is_file() {
                continue;
            }
            match Self::read_view(&path) {
                Ok(view) => views.push(view),
                Err(e) => warn!("Skipping view at {}: {}", path.display(), e),
            }
        }
        views.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(views)
    }

    fn save(&self, name: &str, mut view: View) -> Result<View, Error> {
        let current = self.load(name)?;
        if let Some(dup) = duplicate_label(&view) {
            return Err(Error::LensAlreadyExists(name.to_string(), dup.to_string()));
        }
        // Neither the name nor the metadata can be changed by callers.
        view.name = current.name.clone();
        view.metadata = current.metadata.clone();

        let metadata = record_revision(current.metadata.clone(), &current, &view, Timestamp::now())?;
        if metadata.version == current.metadata.version {
            debug!("View {} unchanged at version {}", name, metadata.version);
            return Ok(current);
        }
        view.metadata = metadata;
        self.write_view(&view)?;
        debug!("Saved view {} at version {}", name, view.metadata.version);
        Ok(view)
    }

    fn delete(&self, name: &str) -> Result<(), Error> {
        self.ensure_exists(name)?;
        let dir = self.view_dir(name);
        fs::remove_dir_all(&dir)
            .map_err(|e| Error::io(format!("deleting {}", dir.display()), e))?;
        debug!("Deleted view {}", name);
        Ok(())
    }

    fn upload_asset(&self, name: &str, label: &str, module: &[u8]) -> Result<PathBuf, Error> {
        validate_name(label)?;
        validate_module(module)?;
        self.ensure_exists(name)?;
        ensure_path_exists(&self.assets_dir(name))?;
        let path = self.asset_file(name, label);
        write_atomic(&path, module)?;
        debug!(
            "Uploaded {} bytes for lens {} of view {} (sha256 {})",
            module.len(),
            label,
            name,
            sha256(module)
        );
        Ok(path)
    }

    fn delete_asset(&self, name: &str, label: &str) -> Result<(), Error> {
        validate_name(name)?;
        validate_name(label)?;
        let path = self.asset_file(name, label);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted asset {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("deleting {}", path.display()), e)),
        }
    }

    fn asset_blob(&self, name: &str, label: &str) -> Result<String, Error> {
        let view = self.load(name)?;
        let lens = view
            .lens(label)
            .ok_or_else(|| Error::NoSuchLens(name.to_string(), label.to_string()))?;
        let path = self.asset_path(name, lens);
        let module = maybe_read(&path)?
            .ok_or_else(|| Error::NoSuchAsset(name.to_string(), label.to_string(), path.clone()))?;
        Ok(String::from_utf8_lossy(&base64::encode(module)).into_owned())
    }

    fn asset_path(&self, name: &str, lens: &Lens) -> PathBuf {
        let path = Path::new(&lens.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_file(name, &lens.label)
        }
    }
}

fn duplicate_label(view: &View) -> Option<&str> {
    let lenses = &view.transform.lenses;
    lenses
        .iter()
        .enumerate()
        .find(|(i, lens)| lenses[..*i].iter().any(|other| other.label == lens.label))
        .map(|(_, lens)| lens.label.as_str())
}
