use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::source::agenda::{AgendaLink, AgendaSource};
use crate::source::pdf;
use crate::source::youtube::YouTubeSource;
use crate::source::{FetchError, SourceKind, SourceRecord};

/// Scrape stats returned after completion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// List agendas, then download and read each PDF in listing order.
/// A failed listing or document is logged and skipped; the run goes on.
pub async fn scrape_agendas(source: &AgendaSource) -> (Vec<SourceRecord>, ScrapeStats) {
    let links = match source.list_agendas().await {
        Ok(links) => links,
        Err(e) => {
            warn!("Error fetching meeting data: {}", e);
            return (Vec::new(), ScrapeStats::default());
        }
    };

    let total = links.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} agendas (eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut records = Vec::with_capacity(total);
    let mut errors = 0usize;
    for link in links {
        match fetch_agenda(source, &link).await {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping agenda {}: {}", link.url, e);
                errors += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let stats = ScrapeStats {
        total,
        ok: records.len(),
        errors,
    };
    info!("Scraped {} agendas ({} ok, {} errors)", total, stats.ok, errors);
    (records, stats)
}

async fn fetch_agenda(source: &AgendaSource, link: &AgendaLink) -> Result<SourceRecord, FetchError> {
    let bytes = source.download(&link.url).await?;
    let pages = tokio::task::spawn_blocking(move || pdf::extract_pages(&bytes))
        .await
        .map_err(|e| FetchError::Provider(format!("PDF reader panicked: {}", e)))??;
    Ok(agenda_record(link, &pages))
}

pub fn agenda_record(link: &AgendaLink, pages: &[String]) -> SourceRecord {
    SourceRecord {
        id: link.id(),
        kind: SourceKind::Agenda,
        title: link.label.clone(),
        body: pdf::join_pages(pages),
        url: link.url.clone(),
    }
}

/// Channel uploads as records. A failed listing yields no records.
pub async fn scrape_channel(
    source: &YouTubeSource,
    channel_id: &str,
    cap: Option<usize>,
) -> Vec<SourceRecord> {
    match source.fetch_videos(channel_id, cap).await {
        Ok(videos) => videos.into_iter().map(SourceRecord::from).collect(),
        Err(e) => {
            warn!("Error fetching videos for {}: {}", channel_id, e);
            Vec::new()
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::extract_all;

    #[test]
    fn agenda_record_keeps_pages_apart() {
        let link = AgendaLink {
            label: "Download PDF Agenda for Plan Commission".into(),
            url: "https://example.org/files/pc-11-26-25.pdf".into(),
        };
        let pages = vec![
            "Agenda\nNew Business\n12 Elm St".to_string(),
            "Old Business\n40 S Main St".to_string(),
        ];
        let record = agenda_record(&link, &pages);
        assert_eq!(record.id, "pc-11-26-25");
        assert_eq!(record.kind, SourceKind::Agenda);
        assert_eq!(
            extract_all(&record).addresses,
            vec!["12 Elm St", "40 S Main St"]
        );
    }
}
