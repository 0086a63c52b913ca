//! Client-meeting counts per RM per month
//!
//! Feeds the Lumpsum meeting multiplier. Counts arrive from the meetings
//! upload feed as one row per meeting or as pre-aggregated monthly counts.

use crate::identity::normalize_name;
use crate::window::Month;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

#[derive(Debug, Default)]
pub struct MeetingBook {
    counts: HashMap<(Month, String), u32>,
}

impl MeetingBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rm_name: &str, month: Month, count: u32) {
        *self.counts.entry((month, normalize_name(rm_name))).or_insert(0) += count;
    }

    pub fn count_for(&self, rm_name: &str, month: Month) -> u32 {
        self.counts
            .get(&(month, normalize_name(rm_name)))
            .copied()
            .unwrap_or(0)
    }
}

/// Raw CSV row: one meeting per row, or `Count` > 1 for pre-aggregated feeds
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "RMName")]
    rm_name: String,
    #[serde(rename = "MeetingDate")]
    meeting_date: String,
    #[serde(rename = "Count")]
    count: Option<u32>,
}

pub fn load_meeting_book<P: AsRef<Path>>(path: P) -> Result<MeetingBook, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut book = MeetingBook::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let date = NaiveDate::parse_from_str(row.meeting_date.trim(), "%Y-%m-%d")?;
        book.add(&row.rm_name, Month::from_date(date), row.count.unwrap_or(1));
    }

    Ok(book)
}
