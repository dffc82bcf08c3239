pub mod bulk;

use std::collections::BTreeMap;

use crate::fetcher::Artwork;

/// Per-page record of which rows are currently selected. Entries are always
/// replaced wholesale; an absent entry means nothing is selected on that
/// page. Each record belongs to exactly one page, so a record id can appear
/// under at most one key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionLedger {
    entries: BTreeMap<u32, Vec<Artwork>>,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the entry for `page`. An empty selection removes the entry
    /// so "no rows selected" has a single representation.
    pub fn set_page_selection(&mut self, page: u32, records: Vec<Artwork>) {
        if records.is_empty() {
            self.entries.remove(&page);
        } else {
            self.entries.insert(page, records);
        }
    }

    pub fn page_selection(&self, page: u32) -> &[Artwork] {
        self.entries.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selected_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Touched page indices in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Artwork])> + '_ {
        self.entries.iter().map(|(page, rows)| (*page, rows.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
