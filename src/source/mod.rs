pub mod agenda;
pub mod geocode;
pub mod pdf;
pub mod youtube;

use thiserror::Error;

/// Failure of one external fetch. Callers log it and skip the item.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("{url} is not a PDF (content type {content_type:?})")]
    UnsupportedContent { url: String, content_type: String },

    #[error("browser: {0}")]
    Browser(String),

    #[error("unreadable PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("feed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    Provider(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Agenda,
    Video,
}

/// One fetched agenda document or video whose text is scanned for addresses.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub id: String,
    pub kind: SourceKind,
    pub title: String,
    /// Agenda bodies hold one page per form-feed separated chunk.
    pub body: String,
    pub url: String,
}

impl SourceRecord {
    /// The id is reduced to a file-safe name; the watch URL keeps it as given.
    pub fn video(id: &str, title: &str, description: &str) -> Self {
        SourceRecord {
            id: file_id(id, "video"),
            kind: SourceKind::Video,
            title: title.to_string(),
            body: description.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }
}

/// Record ids double as file names: keep `[A-Za-z0-9_-]`, map the rest to `_`.
pub fn file_id(raw: &str, fallback: &str) -> String {
    let id: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if id.is_empty() {
        fallback.to_string()
    } else {
        id
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_video_ids_unchanged() {
        let r = SourceRecord::video("dQw4w9WgXcQ", "t", "");
        assert_eq!(r.id, "dQw4w9WgXcQ");
        assert_eq!(r.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn path_like_video_ids_flattened() {
        assert_eq!(SourceRecord::video("a/b", "t", "").id, "a_b");
        assert_eq!(SourceRecord::video("../escaped", "t", "").id, "___escaped");
        assert_eq!(SourceRecord::video("  ", "t", "").id, "video");
    }
}
