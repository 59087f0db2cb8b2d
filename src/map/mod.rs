pub mod render;

use futures_util::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::MapSettings;
use crate::index::{DetailEntry, GroupingIndex};
use crate::source::geocode::{Coord, Geocoder};
use crate::source::SourceKind;
use crate::store;
use render::escape_html;

/// A placed address, ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coord: Coord,
    pub address: String,
    /// HTML fragment shown when the pin is clicked.
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPlan {
    pub center: Coord,
    pub zoom: u8,
    pub markers: Vec<Marker>,
}

/// Geocode every address of `index` once and turn the hits into markers.
///
/// Misses and lookup errors are logged and skipped. Up to `concurrency` lookups
/// run at once; markers keep index order regardless.
pub async fn build_plan<G: Geocoder>(
    index: &GroupingIndex<'_>,
    geocoder: &G,
    settings: &MapSettings,
    concurrency: usize,
) -> MapPlan {
    let pb = ProgressBar::new(index.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} geocoded ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    // Futures are built up front so the stream holds no higher-ranked closure.
    let pending: Vec<_> = index
        .iter()
        .map(|(address, entries)| async move {
            let result = geocoder.geocode(address).await;
            (address, entries, result)
        })
        .collect();
    let lookups: Vec<_> = stream::iter(pending)
        .buffered(concurrency.max(1))
        .inspect(|_| pb.inc(1))
        .collect()
        .await;
    pb.finish_and_clear();

    let base_url = settings.description_base_url.as_deref();
    let mut markers = Vec::with_capacity(lookups.len());
    for (address, entries, result) in lookups {
        match result {
            Ok(Some(coord)) => markers.push(Marker {
                coord,
                address: address.to_string(),
                popup: popup_html(address, entries, base_url),
            }),
            Ok(None) => warn!("No location found for address: {}", address),
            Err(e) => warn!("Geocoding failed for {}: {}", address, e),
        }
    }
    info!("Placed {} of {} addresses", markers.len(), index.len());

    let [lat, lon] = settings.default_center;
    MapPlan {
        center: mean_center(&markers).unwrap_or(Coord { lat, lon }),
        zoom: settings.zoom,
        markers,
    }
}

/// Arithmetic mean of all marker coordinates.
pub fn mean_center(markers: &[Marker]) -> Option<Coord> {
    if markers.is_empty() {
        return None;
    }
    let n = markers.len() as f64;
    let (lat, lon) = markers
        .iter()
        .fold((0.0, 0.0), |(lat, lon), m| (lat + m.coord.lat, lon + m.coord.lon));
    Some(Coord {
        lat: lat / n,
        lon: lon / n,
    })
}

/// Address heading followed by one list item per mention, in index order.
pub fn popup_html(address: &str, entries: &[DetailEntry<'_>], base_url: Option<&str>) -> String {
    let items: String = entries
        .iter()
        .map(|entry| detail_html(entry, base_url))
        .collect();
    format!(
        "<b>Address:</b> {}<br><b>Details:</b><ul>{}</ul>",
        escape_html(address),
        items
    )
}

fn detail_html(entry: &DetailEntry<'_>, base_url: Option<&str>) -> String {
    let record = entry.record;
    let heading = match &entry.meeting {
        Some(m) => format!("{} - {}", m.date, m.category),
        None => record.title.clone(),
    };
    let (origin, link_text) = match record.kind {
        SourceKind::Video => ("Recording", "Watch Video"),
        SourceKind::Agenda => ("Agenda", "Download PDF"),
    };

    let mut html = format!(
        "<li><b>{}</b><br>{}: <a href=\"{}\" target=\"_blank\">{}</a>",
        escape_html(&heading),
        origin,
        escape_html(&record.url),
        link_text
    );
    if let Some(url) = store::body_url(base_url, &record.id) {
        html.push_str(&format!(
            "<br>Description: <a href=\"{}\" target=\"_blank\">View Details</a>",
            escape_html(&url)
        ));
    }
    html.push_str("</li>");
    html
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::source::{FetchError, SourceRecord};

    const TOWN: &str = "Fortville, IN";

    struct NoHits;

    impl Geocoder for NoHits {
        async fn geocode(&self, _address: &str) -> Result<Option<Coord>, FetchError> {
            Ok(None)
        }
    }

    /// Places "Main" addresses at fixed points, fails on "Church", misses the rest.
    #[derive(Default)]
    struct Scripted {
        calls: Mutex<Vec<String>>,
    }

    impl Geocoder for Scripted {
        async fn geocode(&self, address: &str) -> Result<Option<Coord>, FetchError> {
            self.calls.lock().unwrap().push(address.to_string());
            if address.starts_with("123 W Main") {
                Ok(Some(Coord { lat: 40.0, lon: -86.0 }))
            } else if address.starts_with("200 E Main") {
                Ok(Some(Coord { lat: 39.0, lon: -85.0 }))
            } else if address.contains("Church") {
                Err(FetchError::Provider("timed out".into()))
            } else {
                Ok(None)
            }
        }
    }

    fn settings() -> MapSettings {
        MapSettings {
            default_center: [1.5, -2.5],
            ..MapSettings::default()
        }
    }

    fn records() -> Vec<SourceRecord> {
        vec![
            SourceRecord::video(
                "abc123",
                "11/26/25 - Fortville Plan Commission",
                "Address: 123 W Main St. Also 9 Church St and 5 Nowhere Ln.",
            ),
            SourceRecord::video(
                "def456",
                "Budget <Workshop>",
                "Revisit 123 W Main St and 200 E Main St.",
            ),
        ]
    }

    #[tokio::test]
    async fn all_misses_fall_back_to_default_center() {
        let records = records();
        let index = GroupingIndex::build(&records, TOWN);
        let plan = build_plan(&index, &NoHits, &settings(), 1).await;
        assert!(plan.markers.is_empty());
        assert_eq!(plan.center, Coord { lat: 1.5, lon: -2.5 });
        assert_eq!(plan.zoom, 12);
    }

    #[tokio::test]
    async fn empty_index_gives_empty_plan() {
        let index = GroupingIndex::build(&[], TOWN);
        let plan = build_plan(&index, &NoHits, &settings(), 4).await;
        assert!(plan.markers.is_empty());
        assert_eq!(plan.center, Coord { lat: 1.5, lon: -2.5 });
    }

    #[tokio::test]
    async fn each_address_geocoded_once_and_failures_skipped() {
        let records = records();
        let index = GroupingIndex::build(&records, TOWN);
        let geocoder = Scripted::default();
        let plan = build_plan(&index, &geocoder, &settings(), 1).await;

        let calls = geocoder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "123 W Main St, Fortville, IN",
                "9 Church St, Fortville, IN",
                "5 Nowhere Ln, Fortville, IN",
                "200 E Main St, Fortville, IN",
            ]
        );

        let placed: Vec<&str> = plan.markers.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(
            placed,
            vec!["123 W Main St, Fortville, IN", "200 E Main St, Fortville, IN"]
        );
        assert_eq!(plan.center, Coord { lat: 39.5, lon: -85.5 });
    }

    #[tokio::test]
    async fn concurrent_lookups_keep_association() {
        let records = records();
        let index = GroupingIndex::build(&records, TOWN);
        let plan = build_plan(&index, &Scripted::default(), &settings(), 8).await;
        assert_eq!(plan.markers.len(), 2);
        assert_eq!(plan.markers[0].coord, Coord { lat: 40.0, lon: -86.0 });
        assert_eq!(plan.markers[1].address, "200 E Main St, Fortville, IN");
        assert_eq!(plan.markers[1].coord, Coord { lat: 39.0, lon: -85.0 });
    }

    #[tokio::test]
    async fn popup_lists_mentions_in_order() {
        let records = records();
        let index = GroupingIndex::build(&records, TOWN);
        let mut s = settings();
        s.description_base_url = Some("https://files.example.org/descriptions".into());
        let plan = build_plan(&index, &Scripted::default(), &s, 1).await;

        let popup = &plan.markers[0].popup;
        let first = popup.find("11/26/25 - Fortville Plan Commission").unwrap();
        let second = popup.find("Budget &lt;Workshop&gt;").unwrap();
        assert!(first < second);
        assert!(popup.contains("https://www.youtube.com/watch?v=abc123"));
        assert!(popup.contains("https://files.example.org/descriptions/def456.txt"));
        assert_eq!(popup.matches("<li>").count(), 2);
    }

    #[test]
    fn agenda_popup_links_pdf_without_description() {
        let record = SourceRecord {
            id: "pc-agenda".into(),
            kind: SourceKind::Agenda,
            title: "Download PDF Agenda for Plan Commission".into(),
            body: String::new(),
            url: "https://example.org/pc-agenda.pdf?a=1&b=2".into(),
        };
        let entries = [DetailEntry {
            meeting: None,
            record: &record,
        }];
        let html = popup_html("12 Elm St, Fortville, IN", &entries, None);
        assert!(html.contains("Agenda: <a href=\"https://example.org/pc-agenda.pdf?a=1&amp;b=2\""));
        assert!(html.contains("Download PDF Agenda for Plan Commission"));
        assert!(!html.contains("View Details"));
    }

    #[test]
    fn mean_of_markers() {
        let m = |lat, lon| Marker {
            coord: Coord { lat, lon },
            address: String::new(),
            popup: String::new(),
        };
        assert_eq!(mean_center(&[]), None);
        assert_eq!(
            mean_center(&[m(10.0, 20.0), m(20.0, 40.0), m(30.0, 60.0)]),
            Some(Coord { lat: 20.0, lon: 40.0 })
        );
    }
}
