use lopdf::Document;
use tracing::{debug, warn};

use super::FetchError;
use crate::parser::sections::PAGE_BREAK;

/// Plain text of every readable page, in page order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, FetchError> {
    let doc = Document::load_mem(bytes)?;
    let mut pages = Vec::new();
    for (number, _) in doc.get_pages() {
        match doc.extract_text(&[number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text),
            Ok(_) => debug!(page = number, "page has no text layer"),
            Err(e) => warn!(page = number, "skipping unreadable page: {}", e),
        }
    }
    Ok(pages)
}

/// Pages joined into one record body.
pub fn join_pages(pages: &[String]) -> String {
    pages.join(&PAGE_BREAK.to_string())
}
