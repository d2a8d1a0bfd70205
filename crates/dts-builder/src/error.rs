//! Error kinds produced while building declaration bundles
//!
//! Every failure is local to one bundle except argument-shape problems, which
//! are reported before any bundle starts.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    /// Malformed descriptor, discovery root or file pattern
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Import statements that no catalog entry recognizes
    #[error("could not handle {} import statement(s): {}", statements.len(), statements.join(" | "))]
    UnhandledImport { statements: Vec<String> },

    /// Filesystem failure with the operation and path that caused it
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No declaration files below the source directory
    #[error("no declaration files found in {}", dir.display())]
    EmptySource { dir: PathBuf },

    /// Configuration file could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl BundleError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
