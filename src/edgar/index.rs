//! Quarterly master index: locating and parsing.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use super::ARCHIVE_BASE_URL;
use crate::models::IndexEntry;

/// Banner lines preceding the data rows of a master index.
pub const INDEX_HEADER_LINES: usize = 11;

/// Why a data line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexLineError {
    #[error("expected 5 '|'-separated fields, found {0}")]
    FieldCount(usize),
    #[error("invalid date filed {0:?}")]
    Date(String),
}

/// Parse one `cik|name|form|date|path` data line.
pub fn parse_index_line(line: &str) -> Result<IndexEntry, IndexLineError> {
    let parts: Vec<&str> = line.trim().split('|').collect();
    let &[cik, company_name, form_type, date_filed, filename] = parts.as_slice() else {
        return Err(IndexLineError::FieldCount(parts.len()));
    };

    let date_filed = NaiveDate::parse_from_str(date_filed.trim(), "%Y-%m-%d")
        .map_err(|_| IndexLineError::Date(date_filed.to_string()))?;

    Ok(IndexEntry {
        cik: cik.trim().to_string(),
        company_name: company_name.trim().to_string(),
        form_type: form_type.trim().to_string(),
        date_filed,
        filename: filename.trim().to_string(),
    })
}

/// Parse a master index document.
///
/// The banner is skipped; blank lines are ignored and malformed lines are
/// logged and skipped without aborting the parse.
pub fn parse_master_index(text: &str) -> Vec<IndexEntry> {
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in text.lines().enumerate().skip(INDEX_HEADER_LINES) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_index_line(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                skipped += 1;
                warn!("Skipping master index line {}: {}", line_no + 1, e);
            }
        }
    }

    debug!(
        "Parsed {} master index entries ({} skipped)",
        entries.len(),
        skipped
    );
    entries
}

/// Quarter (1-4) containing `date`.
pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

pub fn master_index_url(year: i32, quarter: u32) -> String {
    format!(
        "{}/edgar/full-index/{}/QTR{}/master.idx",
        ARCHIVE_BASE_URL, year, quarter
    )
}

/// Master index URLs from the quarter containing `today` back through
/// `years` calendar years (the current year counts as one), newest first.
pub fn master_index_urls(today: NaiveDate, years: u32) -> Vec<String> {
    let current_year = today.year();
    let current_quarter = quarter_of(today);
    let years = i32::try_from(years).unwrap_or(i32::MAX);

    let mut urls = Vec::new();
    for offset in 0..years {
        let year = current_year - offset;
        let last_quarter = if offset == 0 { current_quarter } else { 4 };
        for quarter in (1..=last_quarter).rev() {
            urls.push(master_index_url(year, quarter));
        }
    }
    urls
}
