//! Copies external declaration files next to a bundle and references them

use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    config::BundleDescriptor,
    error::{BundleError, Result},
    fs::BundleFs,
};

/// An external declaration file placed in the destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedExternal {
    /// Base file name inside the destination directory
    pub file_name: String,
    pub destination: PathBuf,
    /// `/// <reference path="<file_name>" />`
    pub reference: String,
}

/// Triple-slash reference to a file next to the bundle
pub fn reference_line(file_name: &str) -> String {
    format!("/// <reference path=\"{file_name}\" />")
}

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BundleError::invalid(format!(
                "external reference {} has no file name",
                path.display()
            ))
        })
}

/// Plan the links for a bundle's externals without touching the filesystem
pub fn plan_externals(bundle: &BundleDescriptor) -> Result<Vec<LinkedExternal>> {
    bundle
        .externals
        .iter()
        .map(|external| {
            let file_name = base_name(external)?;
            Ok(LinkedExternal {
                destination: bundle.dest_dir.join(&file_name),
                reference: reference_line(&file_name),
                file_name,
            })
        })
        .collect()
}

/// Copy every external into the destination directory, in order.
///
/// The first failed copy aborts the bundle.
pub fn link_externals(bundle: &BundleDescriptor, fs: &dyn BundleFs) -> Result<Vec<LinkedExternal>> {
    let linked = plan_externals(bundle)?;
    for (source, link) in bundle.externals.iter().zip(&linked) {
        let bytes = fs.copy(source, &link.destination)?;
        debug!(
            "Copied external reference {} ({bytes} bytes)",
            link.file_name
        );
    }
    Ok(linked)
}

/// Put the reference lines in front of `text`, separated by one newline
pub fn prepend_references(linked: &[LinkedExternal], text: &str) -> String {
    if linked.is_empty() {
        return text.to_owned();
    }
    let references = linked
        .iter()
        .map(|link| link.reference.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!("{references}\n{text}")
}
