//! Catalog of the declaration idioms the bundler understands
//!
//! Every recognizer is a multiline, line-anchored regular expression that
//! accepts both `\n` and `\r\n` line endings. The
//! catalog is kept in application order: the optimizer walks it once per
//! [`Stage`], so supporting a new idiom means adding one entry here.

use once_cell::sync::Lazy;
use regex::Regex;

/// Identity of a recognizer in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recognizer {
    /// `import { a } from "./a";`, `import "./side-effect";`, `import x = require("x");`
    ExternalImport,
    /// `import Foo = Bar.Baz.Foo;`
    InternalAliasingImport,
    /// `import("./bar").Foo`
    InternalInlineImport,
    /// `/// <reference path="lib.d.ts" />`
    TripleSlashReference,
    /// `declare var _default: string; export default _default;`
    DefaultExportScalar,
    /// `export default Foo;` or `export Foo;`
    BareExport,
    /// `export * from "./lib";`, `export { a } from "./a";`
    ReExport,
    /// `export { a, b };`, `export {};`
    NamedExportList,
}

/// When a recognizer runs relative to the unhandled-import guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolves import statements, runs before the guard
    Imports,
    /// Erases statements that lose meaning after merging, runs after the guard
    Cleanup,
}

/// What the optimizer does with a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Delete the matched text
    Strip,
    /// Record the captured `(alias, target)` pair, then delete the match
    Extract,
    /// Replace the match with its `member` capture group
    Unwrap,
}

#[derive(Debug)]
pub struct Pattern {
    pub recognizer: Recognizer,
    pub stage: Stage,
    pub action: Action,
    pub regex: Regex,
}

impl Pattern {
    fn new(recognizer: Recognizer, stage: Stage, action: Action, source: &str) -> Self {
        Self {
            recognizer,
            stage,
            action,
            regex: Regex::new(source).expect("static regex must compile"),
        }
    }
}

const EXTERNAL_IMPORT: &str = concat!(
    r"(?mR)^[ \t]*import",
    r#"(?:\s+[*{}\w\s,$]*["'][^"'\n]+["']"#,
    r#"|[ \t]+[A-Za-z_$][\w$]*[ \t]*=[ \t]*require[ \t]*\([ \t]*["'][^"'\n]+["'][ \t]*\))"#,
    r"[ \t]*;[ \t]*$",
);

const INTERNAL_ALIASING_IMPORT: &str = r"(?mR)^[ \t]*import[ \t]+(?P<alias>[A-Za-z_$][\w$]*)[ \t]*=[ \t]*(?P<target>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)[ \t]*;[ \t]*$";

const INTERNAL_INLINE_IMPORT: &str =
    r#"\bimport[ \t]*\([ \t]*["'][^"'\n]*["'][ \t]*\)[ \t]*\.[ \t]*(?P<member>[A-Za-z_$][\w$]*)"#;

const TRIPLE_SLASH_REFERENCE: &str = r#"(?mR)^[ \t]*///[ \t]*<[ \t]*reference[ \t]+path[ \t]*=[ \t]*["'][^"'\n]+["'][ \t]*/?[ \t]*>[ \t]*$"#;

const DEFAULT_EXPORT_SCALAR: &str = r"(?mR)^[ \t]*declare[ \t]+(?:var|let|const)[ \t]+_default[ \t]*:[ \t]*[\w$.]+[ \t]*;\s*export[ \t]+default[ \t]+_default[ \t]*;[ \t]*$";

const BARE_EXPORT: &str =
    r"(?mR)^[ \t]*export[ \t]+(?:default[ \t]+)?[A-Za-z_$][\w$]*[ \t]*;[ \t]*$";

const RE_EXPORT: &str = r#"(?mR)^[ \t]*export[ \t]+(?:type[ \t]+)?(?:\*(?:[ \t]+as[ \t]+[A-Za-z_$][\w$]*)?|\{[^}]*\})\s*from\s*["'][^"'\n]+["'][ \t]*;[ \t]*$"#;

const NAMED_EXPORT_LIST: &str = r"(?mR)^[ \t]*export[ \t]+(?:type[ \t]+)?\{[^}]*\}[ \t]*;[ \t]*$";

/// All recognizers, in the order the optimizer applies them.
///
/// The scalar default-export idiom precedes the bare-export one because the
/// latter would otherwise eat `export default _default;` and leave the
/// `declare var _default` half behind.
pub static CATALOG: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        Pattern::new(
            Recognizer::ExternalImport,
            Stage::Imports,
            Action::Strip,
            EXTERNAL_IMPORT,
        ),
        Pattern::new(
            Recognizer::InternalAliasingImport,
            Stage::Imports,
            Action::Extract,
            INTERNAL_ALIASING_IMPORT,
        ),
        Pattern::new(
            Recognizer::InternalInlineImport,
            Stage::Imports,
            Action::Unwrap,
            INTERNAL_INLINE_IMPORT,
        ),
        Pattern::new(
            Recognizer::TripleSlashReference,
            Stage::Cleanup,
            Action::Strip,
            TRIPLE_SLASH_REFERENCE,
        ),
        Pattern::new(
            Recognizer::DefaultExportScalar,
            Stage::Cleanup,
            Action::Strip,
            DEFAULT_EXPORT_SCALAR,
        ),
        Pattern::new(
            Recognizer::BareExport,
            Stage::Cleanup,
            Action::Strip,
            BARE_EXPORT,
        ),
        Pattern::new(
            Recognizer::ReExport,
            Stage::Cleanup,
            Action::Strip,
            RE_EXPORT,
        ),
        Pattern::new(
            Recognizer::NamedExportList,
            Stage::Cleanup,
            Action::Strip,
            NAMED_EXPORT_LIST,
        ),
    ]
});

/// Anything that still looks like an import once the catalog has run
static IMPORT_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:export[ \t]+)?import\b|\bimport[ \t]*\(")
        .expect("static regex must compile")
});

/// Canonical form of an internal aliasing import, anchored to a single line
pub(crate) static INTERNAL_IMPORT_PARTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^import[ \t]+([A-Za-z_$][\w$]*)[ \t]*=[ \t]*([A-Za-z_$][\w$.]*);$")
        .expect("static regex must compile")
});

/// Look up a catalog entry
pub fn pattern(recognizer: Recognizer) -> &'static Pattern {
    CATALOG
        .iter()
        .find(|p| p.recognizer == recognizer)
        .expect("every recognizer has a catalog entry")
}

/// Catalog entries for one stage, in application order
pub fn stage(stage: Stage) -> impl Iterator<Item = &'static Pattern> {
    CATALOG.iter().filter(move |p| p.stage == stage)
}

/// Classification of one import-like line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportClass {
    External,
    InternalAliasing,
    InternalInline,
    Unrecognized,
}

/// Whether a single line still contains an import keyword in statement or call position
pub fn is_import_like(line: &str) -> bool {
    IMPORT_LIKE.is_match(line)
}

/// Whether a line belongs to a `//` comment or a `/* ... */` block such as JSDoc
pub fn is_comment_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
}

/// Classify a single line, `None` when it is not import-like at all
pub fn classify_line(line: &str) -> Option<ImportClass> {
    if !is_import_like(line) {
        return None;
    }
    let class = if pattern(Recognizer::ExternalImport).regex.is_match(line) {
        ImportClass::External
    } else if pattern(Recognizer::InternalAliasingImport)
        .regex
        .is_match(line)
    {
        ImportClass::InternalAliasing
    } else if pattern(Recognizer::InternalInlineImport)
        .regex
        .is_match(line)
    {
        ImportClass::InternalInline
    } else {
        ImportClass::Unrecognized
    };
    Some(class)
}
