//! Filesystem collaborators used by the bundle pipeline

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    discovery::{self, FileMatcher},
    error::{BundleError, Result},
};

/// Everything the orchestrator needs from the filesystem.
///
/// Implementations are shared between bundles running in parallel.
pub trait BundleFs: Sync {
    /// Ordered list of files below `root` accepted by `matcher`
    fn discover(&self, root: &Path, matcher: &FileMatcher) -> Result<Vec<PathBuf>>;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Byte-for-byte copy, returning the number of bytes written
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Create `dir` and its parents; an existing directory is not an error
    fn ensure_dir(&self, dir: &Path) -> Result<()>;

    /// Replace `path` with `text` so readers never observe a partial file
    fn write(&self, path: &Path, text: &str) -> Result<()>;
}

/// Temporary file in the directory of `path`, so persisting it is a rename
fn temp_file_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).map_err(|e| BundleError::io("create temp file in", dir, e))
}

/// [`BundleFs`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl BundleFs for LocalFs {
    fn discover(&self, root: &Path, matcher: &FileMatcher) -> Result<Vec<PathBuf>> {
        discovery::discover(root, matcher)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| BundleError::io("read", path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        let mut source = File::open(from).map_err(|e| BundleError::io("copy", from, e))?;
        let mut temp = temp_file_beside(to)?;
        let copied = io::copy(&mut source, &mut temp)
            .and_then(|copied| temp.as_file().sync_all().map(|()| copied))
            .map_err(|e| BundleError::io("copy", from, e))?;
        temp.persist(to)
            .map_err(|e| BundleError::io("copy", to, e.error))?;
        Ok(copied)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| BundleError::io("create directory", dir, e))
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        let mut temp = temp_file_beside(path)?;
        temp.write_all(text.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| BundleError::io("write", temp.path().to_path_buf(), e))?;
        temp.persist(path)
            .map_err(|e| BundleError::io("write", path, e.error))?;
        Ok(())
    }
}
