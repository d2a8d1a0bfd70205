//! Identifier transforms for bundle names

/// Split a bundle name on runs of non-word characters, dropping empty segments
fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
}

/// File-name form of a bundle name: `"My Bundle"` becomes `"my-bundle"`
pub fn to_kebab(name: &str) -> String {
    segments(name)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Namespace form of a bundle name: `"my-bundle"` becomes `"myBundle"`.
///
/// Every segment is lowercased first, so a single-segment name such as
/// `"Single"` comes out as `"single"`.
pub fn to_camel(name: &str) -> String {
    let mut camel = String::with_capacity(name.len());
    for (index, part) in segments(name).enumerate() {
        let lower = part.to_lowercase();
        if index == 0 {
            camel.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            camel.extend(first.to_uppercase());
            camel.push_str(chars.as_str());
        }
    }
    camel
}
