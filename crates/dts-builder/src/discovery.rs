//! Recursive, deterministic discovery of declaration files

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::error::{BundleError, Result};

/// Default pattern for declaration files
pub const DECLARATION_PATTERN: &str = r"\.d\.ts$";

/// Predicate over discovered file paths
#[derive(Debug, Clone)]
pub struct FileMatcher {
    regex: Regex,
}

impl FileMatcher {
    /// Build a matcher from a regular expression tested against the whole path
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            BundleError::invalid(format!("invalid file pattern {pattern:?}: {e}"))
        })?;
        Ok(Self { regex })
    }

    /// Matches `*.d.ts` files
    pub fn declarations() -> Self {
        Self {
            regex: Regex::new(DECLARATION_PATTERN).expect("static regex must compile"),
        }
    }

    pub fn is_match(&self, path: &Path) -> bool {
        self.regex.is_match(&path.to_string_lossy())
    }
}

impl Default for FileMatcher {
    fn default() -> Self {
        Self::declarations()
    }
}

/// Files sort before directories, then by file name
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Find every file below `root` accepted by `matcher`.
///
/// Within a directory, its own files are listed in lexicographic order before
/// the matches of its subdirectories, which are visited in lexicographic order
/// too. The result is identical for identical trees. An empty result is not an
/// error.
pub fn discover(root: &Path, matcher: &FileMatcher) -> Result<Vec<PathBuf>> {
    if root.as_os_str().is_empty() {
        return Err(BundleError::invalid("discovery root is empty"));
    }
    if !root.is_dir() {
        return Err(BundleError::invalid(format!(
            "discovery root {} is not a directory",
            root.display()
        )));
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(root).sort_by(files_first) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            BundleError::io(
                "walk",
                path,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.path()) {
            trace!("Matched {}", entry.path().display());
            matches.push(entry.into_path());
        }
    }

    debug!(
        "Discovered {} file(s) under {}",
        matches.len(),
        root.display()
    );
    Ok(matches)
}
