pub mod addresses;
pub mod meetings;

use addresses::AddressPattern;
use meetings::MeetingDetail;

use super::sections;
use crate::source::{SourceKind, SourceRecord};

/// What one record contributes to the grouping index.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedData {
    pub addresses: Vec<String>,
    pub meeting: Option<MeetingDetail>,
}

pub fn extract_all(record: &SourceRecord) -> ExtractedData {
    let addresses = match record.kind {
        SourceKind::Agenda => sections::pages(&record.body)
            .flat_map(|page| {
                let page = sections::normalize(page);
                sections::business_sections(&page)
                    .into_iter()
                    .flat_map(|s| addresses::extract(s, AddressPattern::Loose))
                    .collect::<Vec<_>>()
            })
            .collect(),
        SourceKind::Video => {
            addresses::extract(&sections::normalize(&record.body), AddressPattern::Strict)
        }
    };

    ExtractedData {
        addresses,
        meeting: meetings::parse_title(&record.title),
    }
}

// ── Tests ──
