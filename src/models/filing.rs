//! Archive index entries and the filings selected from them.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One row of a quarterly master index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Filer number as it appears in the index (not zero-padded).
    pub cik: String,
    pub company_name: String,
    pub form_type: String,
    pub date_filed: NaiveDate,
    /// Path relative to the archive root, e.g. `edgar/data/320193/0000320193-23-000106.txt`.
    pub filename: String,
}

/// A filing chosen for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRef {
    /// Zero-padded 10-digit filer number.
    pub cik: String,
    pub company_name: String,
    pub form_type: String,
    pub date_filed: NaiveDate,
    pub url: String,
    pub accession_number: String,
}

impl FilingRef {
    /// Calendar year the filing was made, used as its storage period.
    pub fn year(&self) -> i32 {
        self.date_filed.year()
    }
}
