use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::store::Store;
use crate::types::{HistoryMode, PredictionRecord};

pub const COMPACT_LEN: usize = 5;

const CSV_HEADER: &str =
    "Sqft Living,Bedrooms,Bathrooms,Lot Size,Floors,House Age,Zipcode,Purpose,Predicted Price,Date";

/// Append-only prediction log. The view mode lives here but is never
/// persisted.
pub struct HistoryStore {
    mode: HistoryMode,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self {
            mode: HistoryMode::Compact,
        }
    }
}

impl HistoryStore {
    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
    }

    pub fn append(&mut self, store: &Store, record: PredictionRecord) -> Result<()> {
        let mut log = store.history();
        log.push(record);
        self.mode = HistoryMode::Compact;
        store.set_history(&log)
    }

    pub fn clear(&mut self, store: &Store) -> Result<()> {
        self.mode = HistoryMode::Compact;
        store.clear_history()
    }

    /// Newest first; compact mode keeps only the latest five.
    pub fn list(&self, store: &Store, mode: HistoryMode) -> Vec<PredictionRecord> {
        let iter = store.history().into_iter().rev();
        match mode {
            HistoryMode::Compact => iter.take(COMPACT_LEN).collect(),
            HistoryMode::Full => iter.collect(),
        }
    }

    pub fn visible(&self, store: &Store) -> Vec<PredictionRecord> {
        self.list(store, self.mode)
    }

    /// The expand/collapse control only matters once there is more to show.
    pub fn can_toggle(&self, store: &Store) -> bool {
        store.history().len() > COMPACT_LEN
    }
}

pub fn to_csv(records: &[PredictionRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in records {
        let date = r
            .recorded_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let price = r
            .predicted_price
            .map(|p| format!("{:.2}", p))
            .unwrap_or_default();
        let row = [
            r.sqft_living.as_str(),
            r.no_of_bedrooms.as_str(),
            r.no_of_bathrooms.as_str(),
            r.sqft_lot.as_str(),
            r.no_of_floors.as_str(),
            r.house_age.as_str(),
            r.zipcode.as_str(),
            r.purpose.as_str(),
            price.as_str(),
            date.as_str(),
        ]
        .iter()
        .map(|v| csv_field(v))
        .collect::<Vec<_>>()
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn csv_field(v: &str) -> String {
    if v.contains([',', '"', '\n']) {
        format!("\"{}\"", v.replace('"', "\"\""))
    } else {
        v.to_string()
    }
}

/// Writes the whole log, oldest first. Returns how many rows were written.
pub fn export_csv(store: &Store, path: &Path) -> Result<usize> {
    let records = store.history();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_csv(&records))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(records.len())
}
