//! Bundle descriptors and the TOML configuration file that lists them

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{
    discovery::FileMatcher,
    error::{BundleError, Result},
    naming::{to_camel, to_kebab},
};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "dts-builder.toml";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("static regex must compile"));

const fn default_wrap() -> bool {
    true
}

/// One unit of work: a directory of declaration files merged into one file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BundleDescriptor {
    /// Used for the output file name and the wrapping namespace
    pub name: String,
    /// Directory searched recursively for declaration files
    pub source_dir: PathBuf,
    /// Directory receiving `<kebab name>.d.ts` and copied externals
    pub dest_dir: PathBuf,
    /// Declaration files copied next to the bundle and referenced from it
    #[serde(default)]
    pub externals: Vec<PathBuf>,
    /// Wrap the merged declarations in a namespace; turn off for input that
    /// already declares its own namespaces
    #[serde(default = "default_wrap")]
    pub wrap: bool,
    /// Extra name bound to the bundle namespace
    #[serde(default)]
    pub alias: Option<String>,
    /// Regular expression selecting declaration files, `\.d\.ts$` by default
    #[serde(default)]
    pub file_pattern: Option<String>,
}

impl BundleDescriptor {
    pub fn new(name: impl Into<String>, source_dir: PathBuf, dest_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            source_dir,
            dest_dir,
            externals: Vec::new(),
            wrap: true,
            alias: None,
            file_pattern: None,
        }
    }

    /// Check the fields the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || to_kebab(&self.name).is_empty() {
            return Err(BundleError::invalid(format!(
                "bundle name {:?} must contain at least one alphanumeric character",
                self.name
            )));
        }
        let namespace = to_camel(&self.name);
        if !IDENTIFIER.is_match(&namespace) {
            return Err(BundleError::invalid(format!(
                "bundle name {:?} gives namespace {namespace:?}, which is not a valid identifier",
                self.name
            )));
        }
        if self.source_dir.as_os_str().is_empty() {
            return Err(BundleError::invalid(format!(
                "bundle '{}' is missing a source directory",
                self.name
            )));
        }
        if self.dest_dir.as_os_str().is_empty() {
            return Err(BundleError::invalid(format!(
                "bundle '{}' is missing a destination directory",
                self.name
            )));
        }
        if let Some(alias) = &self.alias
            && !IDENTIFIER.is_match(alias)
        {
            return Err(BundleError::invalid(format!(
                "alias {alias:?} of bundle '{}' is not a valid identifier",
                self.name
            )));
        }
        Ok(())
    }

    /// Path of the generated bundle file
    pub fn dest_file(&self) -> PathBuf {
        self.dest_dir.join(format!("{}.d.ts", to_kebab(&self.name)))
    }

    /// Matcher for the files that belong to this bundle
    pub fn matcher(&self) -> Result<FileMatcher> {
        match &self.file_pattern {
            Some(pattern) => FileMatcher::new(pattern),
            None => Ok(FileMatcher::declarations()),
        }
    }

    fn resolve_against(mut self, base: &Path) -> Self {
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };
        self.source_dir = resolve(&self.source_dir);
        self.dest_dir = resolve(&self.dest_dir);
        self.externals = self.externals.iter().map(|p| resolve(p)).collect();
        self
    }
}

/// Behaviour shared by every bundle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Emit progress messages while bundling
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { verbose: true }
    }
}

/// Contents of a `dts-builder.toml` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Overrides [`Options::verbose`] when present
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default, rename = "bundle")]
    pub bundles: Vec<BundleDescriptor>,
}

impl Config {
    /// Parse configuration text, resolving relative paths against `base_dir`
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| BundleError::Config(e.to_string()))?;
        config.bundles = config
            .bundles
            .into_iter()
            .map(|bundle| bundle.resolve_against(base_dir))
            .collect();
        Ok(config)
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| {
            BundleError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base_dir)
    }

    /// Run options after applying the file's overrides to `defaults`
    pub fn options(&self, defaults: Options) -> Options {
        Options {
            verbose: self.verbose.unwrap_or(defaults.verbose),
        }
    }
}
