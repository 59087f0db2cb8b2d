use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::parser::extract::{extract_all, meetings::MeetingDetail};
use crate::source::SourceRecord;

/// One mention of an address: the record it came from and that record's parsed title.
#[derive(Debug, Clone)]
pub struct DetailEntry<'a> {
    pub meeting: Option<MeetingDetail>,
    pub record: &'a SourceRecord,
}

/// Addresses keyed by their trimmed text, in first-seen order.
///
/// Keys are compared exactly: "12 Elm St" and "12 Elm Street" stay separate.
/// Entries borrow the records of the run that built the index.
#[derive(Debug, Default)]
pub struct GroupingIndex<'a> {
    positions: HashMap<String, usize>,
    groups: Vec<(String, Vec<DetailEntry<'a>>)>,
}

impl<'a> GroupingIndex<'a> {
    /// Scan every record and group its addresses. Addresses without a comma get
    /// `", {locality}"` appended when `locality` is non-empty.
    pub fn build(records: &'a [SourceRecord], locality: &str) -> Self {
        let extracted: Vec<_> = records.par_iter().map(extract_all).collect();

        let mut index = GroupingIndex::default();
        for (record, data) in records.iter().zip(extracted) {
            debug!(
                record = %record.id,
                addresses = data.addresses.len(),
                dated = data.meeting.is_some(),
                "scanned record"
            );
            for address in &data.addresses {
                index.insert(
                    &with_locality(address, locality),
                    DetailEntry {
                        meeting: data.meeting.clone(),
                        record,
                    },
                );
            }
        }
        index
    }

    pub fn insert(&mut self, address: &str, entry: DetailEntry<'a>) {
        let key = address.trim();
        match self.positions.get(key) {
            Some(&pos) => self.groups[pos].1.push(entry),
            None => {
                self.positions.insert(key.to_string(), self.groups.len());
                self.groups.push((key.to_string(), vec![entry]));
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, address: &str) -> Option<&[DetailEntry<'a>]> {
        let pos = *self.positions.get(address.trim())?;
        Some(&self.groups[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DetailEntry<'a>])> {
        self.groups
            .iter()
            .map(|(address, entries)| (address.as_str(), entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Give geocoders a town to search in when the agenda or description omitted it.
pub fn with_locality(address: &str, locality: &str) -> String {
    let address = address.trim();
    let locality = locality.trim();
    if address.contains(',') || locality.is_empty() {
        address.to_string()
    } else {
        format!("{}, {}", address, locality)
    }
}

// ── Tests ──
