//! Content Normalizer: cleans markdown-ish noise out of titles and bullets and decides
//! once, for every backend, whether a bullet list is numbered.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)]\s+").expect("BUG: invalid NUMBERED regex literal"));
static BULLETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*•]\s+").expect("BUG: invalid BULLETED regex literal"));
static LEADING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+[.)]|[-*•])\s+").expect("BUG: invalid LEADING_MARKER regex literal")
});
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*|__|\*|`").expect("BUG: invalid EMPHASIS regex literal"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("BUG: invalid WHITESPACE regex literal"));

/// Bullet lines after normalization, plus the list style every backend must honor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedList {
    pub items: Vec<String>,
    pub numbered: bool,
}

impl NormalizedList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The glyph or number shown before item `index` (zero-based).
    pub fn marker(&self, index: usize) -> String {
        if self.numbered {
            format!("{}.", index + 1)
        } else {
            "•".to_string()
        }
    }

    /// Splits the items into two columns for `two-column` layouts; the left column gets
    /// the extra item when the count is odd.
    pub fn split_columns(&self) -> (&[String], &[String]) {
        let middle = self.items.len().div_ceil(2);
        self.items.split_at(middle)
    }
}

/// Strips list markers and inline emphasis from a single line and collapses whitespace.
pub fn clean_inline(text: &str) -> String {
    let stripped = EMPHASIS.replace_all(text, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    let mut line = collapsed.as_ref();
    // Markers go last so emphasis wrapped around a marker cannot leave a new one behind.
    while let Some(found) = LEADING_MARKER.find(line) {
        line = &line[found.end()..];
    }
    line.to_string()
}

/// Normalizes raw bullet strings.
///
/// 1. Splits every string on line breaks, trims and drops empty lines.
/// 2. Counts numbered (`1.` / `1)`) and bulleted (`-`, `*`, `•`) lines.
/// 3. Marks the list numbered only if numbered lines strictly outnumber bulleted lines and
///    cover at least half of all lines.
/// 4. Cleans each line with [`clean_inline`], dropping lines that end up empty.
pub fn normalize_bullets(raw: &[String]) -> NormalizedList {
    let lines: Vec<&str> = raw
        .iter()
        .flat_map(|entry| entry.split(['\n', '\r']))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let numbered_count = lines.iter().filter(|l| NUMBERED.is_match(l)).count();
    let bulleted_count = lines.iter().filter(|l| BULLETED.is_match(l)).count();
    let numbered = numbered_count > bulleted_count && numbered_count * 2 >= lines.len();

    let items = lines
        .into_iter()
        .map(clean_inline)
        .filter(|item| !item.is_empty())
        .collect();

    NormalizedList { items, numbered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&["1. First", "2. Second", "3. Third"], true, &["First", "Second", "Third"])]
    #[case(&["- First", "- Second"], false, &["First", "Second"])]
    #[case(&["1) One\n2) Two\n- three"], true, &["One", "Two", "three"])]
    #[case(&["1. One", "- two"], false, &["One", "two"])]
    #[case(&["1. One", "plain", "plain", "plain"], false, &["One", "plain", "plain", "plain"])]
    #[case(&["**Bold** and `code`", "  spaced    out  "], false, &["Bold and code", "spaced out"])]
    #[case(&["\r\n", "", "• - nested marker"], false, &["nested marker"])]
    fn classifies_and_cleans(
        #[case] raw: &[&str],
        #[case] numbered: bool,
        #[case] items: &[&str],
    ) {
        let list = normalize_bullets(&strings(raw));
        assert_eq!(list.numbered, numbered);
        assert_eq!(list.items, strings(items));
    }

    #[rstest]
    #[case(&["1. First", "2. Second"])]
    #[case(&["- **a**", "* b", "c\nd"])]
    #[case(&["3) __x__ y", "", "   "])]
    fn normalization_is_idempotent(#[case] raw: &[&str]) {
        let once = normalize_bullets(&strings(raw));
        let twice = normalize_bullets(&once.items);
        assert_eq!(once.items, twice.items);
    }

    #[test]
    fn titles_lose_markdown() {
        assert_eq!(clean_inline("## **Growth**  plan"), "## Growth plan");
        assert_eq!(clean_inline("- Roadmap"), "Roadmap");
    }

    #[test]
    fn markers_and_columns() {
        let list = normalize_bullets(&strings(&["1. a", "2. b", "3. c"]));
        assert_eq!(list.marker(2), "3.");
        let (left, right) = list.split_columns();
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 1);
    }
}
