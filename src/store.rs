use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::source::SourceRecord;

/// Write each record's text body to its own file so popups can link to it.
/// Rewrites files from earlier runs. A record that cannot be written is
/// logged and skipped; returns how many were saved.
pub fn save_bodies(dir: &Path, records: &[SourceRecord]) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let mut saved = 0;
    for record in records {
        let file_name = format!("{}.txt", record.id);
        if !is_bare_name(&file_name) {
            warn!("Not saving body of record {:?}: id is not a plain file name", record.id);
            continue;
        }
        let path = dir.join(file_name);
        match fs::write(&path, &record.body) {
            Ok(()) => {
                debug!(path = %path.display(), "saved body");
                saved += 1;
            }
            Err(e) => warn!("Failed to write {:?}: {}", path, e),
        }
    }
    Ok(saved)
}

/// Link to a saved body under `base_url`, if one is configured.
pub fn body_url(base_url: Option<&str>, id: &str) -> Option<String> {
    let base = base_url?.trim_end_matches('/');
    Some(format!("{}/{}.txt", base, id))
}

/// Read a saved body by file name. Only bare `<name>.txt` names are accepted.
pub fn load_body(dir: &Path, file_name: &str) -> Option<String> {
    if !is_bare_name(file_name) {
        return None;
    }
    fs::read_to_string(dir.join(file_name)).ok()
}

fn is_bare_name(file_name: &str) -> bool {
    file_name.ends_with(".txt")
        && !file_name.starts_with('.')
        && file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// ── Tests ──
