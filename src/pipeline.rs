use anyhow::Result;
use tracing::{info, warn};

use crate::config::Settings;
use crate::index::GroupingIndex;
use crate::map::{self, render, MapPlan};
use crate::source::geocode::Geocoder;
use crate::source::SourceRecord;
use crate::store;

pub struct MapOutput {
    pub plan: MapPlan,
    pub html: String,
    /// Distinct addresses found, placed or not.
    pub addresses: usize,
}

/// Records → saved bodies → grouping index → geocoded plan → HTML page.
pub async fn render_records<G: Geocoder>(
    records: &[SourceRecord],
    geocoder: &G,
    settings: &Settings,
) -> Result<MapOutput> {
    let saved = store::save_bodies(&settings.map.description_dir, records)?;
    info!("Saved {} text bodies to {:?}", saved, settings.map.description_dir);

    let index = GroupingIndex::build(records, &settings.map.default_locality);
    if index.is_empty() {
        warn!(
            "No addresses found in {} records; the map shows the default view",
            records.len()
        );
    } else {
        info!(
            "Grouped {} distinct addresses from {} records",
            index.len(),
            records.len()
        );
    }

    let plan = map::build_plan(&index, geocoder, &settings.map, settings.geocoder.concurrency).await;
    let html = render::render_html(&plan)?;
    Ok(MapOutput {
        addresses: index.len(),
        plan,
        html,
    })
}

// ── Tests ──
