use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{2}) - (.+)").unwrap());

/// Date and meeting type parsed from a title like `11/26/25 - Fortville Plan Commission`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingDetail {
    /// Kept exactly as written; not validated as a calendar date.
    pub date: String,
    pub category: String,
}

/// Split a title into date and category. Titles of any other shape yield `None`.
pub fn parse_title(title: &str) -> Option<MeetingDetail> {
    let caps = TITLE_RE.captures(title)?;
    Some(MeetingDetail {
        date: caps[1].to_string(),
        category: caps[2].trim_end().to_string(),
    })
}

// ── Tests ──
