//! File system-related utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::Error;

/// Canonicalize the given path if it exists. If it does not exist, returns
/// `Ok(None)`.
pub fn maybe_canonicalize<P>(path: P) -> Result<Option<PathBuf>, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(path.canonicalize().map_err(|e| {
            Error::io(format!("canonicalizing {}", path.display()), e)
        })?))
    } else {
        Ok(None)
    }
}

/// Creates the given directory (and its parents) if it does not exist yet.
pub fn ensure_path_exists(path: &Path) -> Result<(), Error> {
    if !path.is_dir() {
        fs::create_dir_all(path)
            .map_err(|e| Error::io(format!("creating directory {}", path.display()), e))?;
        debug!("Created path: {}", path.display());
    }
    Ok(())
}

/// Replaces the contents of the file at `path` with `content`.
///
/// The content is written to a temporary file in the same directory, flushed
/// to disk, and then renamed over `path`. Readers therefore only ever see the
/// old or the new content in full.
pub fn write_atomic<P, C>(path: P, content: C) -> Result<(), Error>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let path = path.as_ref();
    let dir = path
        .parent()
        .ok_or_else(|| Error::io(format!("resolving parent of {}", path.display()), not_found()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io(format!("creating temporary file in {}", dir.display()), e))?;
    tmp.write_all(content.as_ref())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io(format!("writing temporary file for {}", path.display()), e))?;
    tmp.persist(path)
        .map_err(|e| Error::io(format!("replacing {}", path.display()), e.error))?;
    Ok(())
}

/// Reads the whole file at `path`, mapping a missing file to `Ok(None)`.
pub fn maybe_read<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>, Error> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(format!("reading {}", path.display()), e)),
    }
}

fn not_found() -> std::io::Error {
    std::io::Error::from(std::io::ErrorKind::NotFound)
}
