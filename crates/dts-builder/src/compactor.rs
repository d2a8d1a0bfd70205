/// Collapse runs of blank lines into a single blank line.
///
/// A line counts as blank when it holds only whitespace. Non-blank lines and
/// the first blank line of each run pass through unchanged.
pub fn compact_lines(text: &str) -> String {
    let mut previous_blank = false;
    text.split('\n')
        .filter(|line| {
            let blank = line.trim().is_empty();
            let keep = !(blank && previous_blank);
            previous_blank = blank;
            keep
        })
        .collect::<Vec<_>>()
        .join("\n")
}
