use std::sync::LazyLock;

use regex::Regex;

// A house number must not continue a code or a date ("PC-25-14", "11/26/25").
const LEAD: &str = r"(?m)(?:^|[^\w./#-])";
const DIRECTIONAL: &str = r"(?:(?:[NS][EW]?|[EW]) )?";
const STREET_TYPES: &str = "St|Street|Ave|Avenue|Blvd|Boulevard|Rd|Road|Dr|Drive|Ln|Lane|Ct|Court|\
                            Pl|Place|Way|Terr|Terrace|Pkwy|Parkway|Cir|Circle|Trail";

static STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{LEAD}(?P<addr>\d{{1,5}} {DIRECTIONAL}(?:\w+ ){{1,3}}(?:{STREET_TYPES})\b)"
    ))
    .unwrap()
});

static LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{LEAD}(?P<addr>\d{{1,5}} (?:\d{{1,5}} )?{DIRECTIONAL}[A-Za-z0-9]+(?: [A-Za-z0-9]+){{0,3}}(?:, ?[A-Za-z]+(?: [A-Za-z]+)?(?:, ?[A-Za-z]{{2}}\b)?)?)"
    ))
    .unwrap()
});

/// Matching rule applied to free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPattern {
    /// Number, optional directional, up to three words and a required street type.
    /// Used on video descriptions where prose is dense with numbers.
    Strict,
    /// Number, optional lot number and directional, up to four tokens and an
    /// optional ", City, ST" tail. Used on agenda business sections.
    Loose,
}

impl AddressPattern {
    fn regex(self) -> &'static Regex {
        match self {
            AddressPattern::Strict => &STRICT_RE,
            AddressPattern::Loose => &LOOSE_RE,
        }
    }
}

/// Address-like spans of `text` in order of appearance. Duplicates are kept.
pub fn extract(text: &str, pattern: AddressPattern) -> Vec<String> {
    pattern
        .regex()
        .captures_iter(text)
        .filter_map(|caps| caps.name("addr"))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

// ── Tests ──
