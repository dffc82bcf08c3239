use serde::Serialize;

use crate::selection::SelectionLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// One selected row, flattened for export.
#[derive(Clone, Debug, Serialize)]
pub struct SelectionRecord {
    pub page: u32,
    pub id: u64,
    pub title: String,
    pub place_of_origin: String,
    pub artist_display: String,
    pub date_start: Option<i32>,
    pub date_end: Option<i32>,
}

pub fn build_records(ledger: &SelectionLedger) -> Vec<SelectionRecord> {
    ledger
        .iter()
        .flat_map(|(page, rows)| {
            rows.iter().map(move |a| SelectionRecord {
                page,
                id: a.id,
                title: a.title.clone(),
                place_of_origin: a.place_of_origin.clone(),
                artist_display: a.artist_display.clone(),
                date_start: a.date_start,
                date_end: a.date_end,
            })
        })
        .collect()
}

pub fn render_text(records: &[SelectionRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "page {} :: {} :: {} :: {} :: {} :: {}-{}\n",
            r.page,
            r.id,
            r.title,
            r.place_of_origin,
            r.artist_display,
            r.date_start.map(|d| d.to_string()).unwrap_or_default(),
            r.date_end.map(|d| d.to_string()).unwrap_or_default(),
        ));
    }
    out.into_bytes()
}

pub fn render_json(records: &[SelectionRecord]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}
