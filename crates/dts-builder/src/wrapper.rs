//! Wraps an optimized corpus in a `declare module` / `declare namespace` envelope

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{config::BundleDescriptor, naming::to_camel};

const INDENT: &str = "  ";

static EXPORT_DECLARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bexport\s+declare\s+").expect("static regex must compile"));

static DECLARE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bdeclare\s+(class|function|const|var|let|enum|namespace|abstract\s+class)\s+")
        .expect("static regex must compile")
});

/// Drop `declare` modifiers, which are not allowed inside an ambient namespace
fn demodify(line: &str) -> Cow<'_, str> {
    match EXPORT_DECLARE.replacen(line, 1, "export ") {
        Cow::Borrowed(line) => DECLARE_KEYWORD.replacen(line, 1, "$1 "),
        Cow::Owned(line) => Cow::Owned(DECLARE_KEYWORD.replacen(&line, 1, "$1 ").into_owned()),
    }
}

/// Module and namespace header for a camel-cased bundle identifier
fn header(camel: &str) -> String {
    format!(
        "\ndeclare module '{camel}' {{\n{INDENT}export = {camel};\n}}\n\ndeclare namespace {camel} {{"
    )
}

/// Wrap `text` in the bundle's namespace.
///
/// Non-blank lines are indented one level and stripped of `declare`
/// modifiers; blank lines are kept empty. When the bundle has an alias, an
/// `import <alias> = <namespace>;` binding precedes the module block.
pub fn wrap_module(text: &str, bundle: &BundleDescriptor) -> String {
    let camel = to_camel(&bundle.name);
    let mut lines = Vec::with_capacity(text.lines().count() + 8);

    if let Some(alias) = &bundle.alias {
        lines.push(format!("import {alias} = {camel};"));
    }
    lines.push(header(&camel));
    lines.extend(text.split('\n').map(|line| {
        if line.trim().is_empty() {
            String::new()
        } else {
            format!("{INDENT}{}", demodify(line))
        }
    }));
    lines.push("}".to_owned());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn bundle(name: &str, alias: Option<&str>) -> BundleDescriptor {
        BundleDescriptor {
            alias: alias.map(str::to_owned),
            ..BundleDescriptor::new(name, PathBuf::from("src"), PathBuf::from("out"))
        }
    }

    #[test]
    fn test_wrap_without_alias() {
        let wrapped = wrap_module(
            "export declare class Foo {}\n\ndeclare function bar(): void;",
            &bundle("my-lib", None),
        );
        assert_eq!(
            wrapped,
            [
                "",
                "declare module 'myLib' {",
                "  export = myLib;",
                "}",
                "",
                "declare namespace myLib {",
                "  export class Foo {}",
                "",
                "  function bar(): void;",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_alias_precedes_module_block() {
        let wrapped = wrap_module("export interface A {}", &bundle("dts-builder", Some("dts")));
        let mut lines = wrapped.lines();
        assert_eq!(lines.next(), Some("import dts = dtsBuilder;"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("declare module 'dtsBuilder' {"));
    }

    #[test]
    fn test_demodify_variants() {
        assert_eq!(demodify("export declare const A: number;"), "export const A: number;");
        assert_eq!(demodify("declare let a: string;"), "let a: string;");
        assert_eq!(demodify("declare enum Kind { A }"), "enum Kind { A }");
        assert_eq!(
            demodify("declare abstract class Base {}"),
            "abstract class Base {}"
        );
        assert_eq!(demodify("export interface I {}"), "export interface I {}");
        assert_eq!(
            demodify("declare type T = string;"),
            "declare type T = string;"
        );
    }

    #[test]
    fn test_wrapped_output_is_balanced_and_indented() {
        let body = "\nimport A = Lib.A;\nexport declare class B {\n    a: A;\n}\n";
        let wrapped = wrap_module(body, &bundle("lib", Some("L")));

        assert_eq!(wrapped.matches("declare module 'lib' {").count(), 1);
        assert_eq!(wrapped.matches("declare namespace lib {").count(), 1);
        assert!(wrapped.ends_with("\n}"));

        let header_lines = 7;
        let content: Vec<&str> = wrapped.split('\n').skip(header_lines).collect();
        let content = &content[..content.len() - 1];
        let original: Vec<&str> = body.split('\n').collect();
        assert_eq!(content.len(), original.len());
        for (wrapped_line, original_line) in content.iter().zip(&original) {
            if original_line.trim().is_empty() {
                assert!(wrapped_line.is_empty());
            } else {
                assert!(wrapped_line.starts_with(INDENT), "{wrapped_line:?}");
                assert!(!wrapped_line.starts_with("   ") || original_line.starts_with(' '));
            }
        }
    }
}
