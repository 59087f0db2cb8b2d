use std::sync::LazyLock;

use regex::Regex;

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static BUSINESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)new business|old business").unwrap());

/// Page break emitted between pages of an extracted document body.
pub const PAGE_BREAK: char = '\x0c';

/// Collapse runs of horizontal whitespace, trim every line and drop blank ones.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| SPACE_RE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a document body into its pages.
pub fn pages(body: &str) -> impl Iterator<Item = &str> {
    body.split(PAGE_BREAK).filter(|p| !p.trim().is_empty())
}

/// Everything that follows a "New Business" / "Old Business" heading on one page.
/// Text before the first heading (roll call, minutes approval, ...) is dropped.
pub fn business_sections(page: &str) -> Vec<&str> {
    BUSINESS_RE.split(page).skip(1).collect()
}

// ── Tests ──
