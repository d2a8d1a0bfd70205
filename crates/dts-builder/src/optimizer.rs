//! Import optimization for a concatenated declaration corpus
//!
//! External imports are dropped, internal aliasing imports are deduplicated and
//! hoisted into one sorted block, inline `import("...")` wrappers are removed,
//! and statements that lose their meaning inside a single namespace are erased.

use std::fmt;

use indexmap::IndexSet;
use log::{debug, trace};

use crate::{
    error::{BundleError, Result},
    patterns::{self, Action, INTERNAL_IMPORT_PARTS, Pattern, Recognizer, Stage},
};

/// An `import <alias> = <target>;` statement that points inside the bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalImport {
    pub alias: String,
    pub target: String,
}

impl InternalImport {
    pub fn new(alias: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            target: target.into(),
        }
    }

    /// Parse a single canonical `import A = B.C;` line
    pub fn parse(line: &str) -> Option<Self> {
        let caps = INTERNAL_IMPORT_PARTS.captures(line.trim())?;
        Some(Self::new(&caps[1], &caps[2]))
    }
}

impl fmt::Display for InternalImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import {} = {};", self.alias, self.target)
    }
}

/// Collect every internal aliasing import in `text`, first occurrence wins
pub fn collect_internal_imports(text: &str) -> IndexSet<InternalImport> {
    let pattern = patterns::pattern(Recognizer::InternalAliasingImport);
    pattern
        .regex
        .captures_iter(text)
        .map(|caps| InternalImport::new(&caps["alias"], &caps["target"]))
        .collect()
}

/// Order imports case-insensitively by target; equal targets keep encounter order
pub fn sort_internal_imports(
    imports: impl IntoIterator<Item = InternalImport>,
) -> Vec<InternalImport> {
    let mut sorted: Vec<_> = imports.into_iter().collect();
    sorted.sort_by_cached_key(|import| import.target.to_lowercase());
    sorted
}

/// Render imports one per line, without a trailing newline
pub fn render_internal_imports(imports: &[InternalImport]) -> String {
    imports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lines that still contain an import keyword the catalog did not resolve.
///
/// Comment lines are ignored, documentation may mention `import("...")` freely.
pub fn unhandled_imports(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !patterns::is_comment_line(line) && patterns::is_import_like(line))
        .map(|line| line.trim().to_owned())
        .collect()
}

fn apply(pattern: &Pattern, text: &str, imports: &mut IndexSet<InternalImport>) -> String {
    match pattern.action {
        Action::Strip => pattern.regex.replace_all(text, "").into_owned(),
        Action::Extract => {
            let found = collect_internal_imports(text);
            trace!("{:?} found {} statement(s)", pattern.recognizer, found.len());
            imports.extend(found);
            pattern.regex.replace_all(text, "").into_owned()
        }
        Action::Unwrap => pattern.regex.replace_all(text, "$member").into_owned(),
    }
}

/// Resolve all import-like statements in a concatenated corpus.
///
/// Fails with [`BundleError::UnhandledImport`] when an import survives the
/// catalog, rather than letting it leak into the bundle.
pub fn optimize_imports(text: &str) -> Result<String> {
    let mut imports = IndexSet::new();
    let mut result = text.to_owned();

    for pattern in patterns::stage(Stage::Imports) {
        result = apply(pattern, &result, &mut imports);
    }

    let unhandled = unhandled_imports(&result);
    if !unhandled.is_empty() {
        return Err(BundleError::UnhandledImport {
            statements: unhandled,
        });
    }

    debug!("Hoisting {} internal import(s)", imports.len());
    let block = render_internal_imports(&sort_internal_imports(imports));
    result = format!("{block}\n{result}");

    for pattern in patterns::stage(Stage::Cleanup) {
        result = apply(pattern, &result, &mut IndexSet::new());
    }

    Ok(result)
}
