//! Selecting a company's filings from parsed index entries.

use tracing::warn;

use super::{normalize_cik, ARCHIVE_BASE_URL};
use crate::models::{FilingRef, IndexEntry};

/// Latest `limit` filings of `form_type` for `cik`, newest first.
///
/// CIKs are compared zero-padded, so `320193` matches `0000320193`.
pub fn select_filings(
    entries: &[IndexEntry],
    cik: &str,
    form_type: &str,
    limit: usize,
) -> Vec<FilingRef> {
    let Some(cik) = normalize_cik(cik) else {
        warn!("Invalid CIK {:?}, no filings selected", cik);
        return Vec::new();
    };

    let mut matching: Vec<&IndexEntry> = entries
        .iter()
        .filter(|e| e.form_type == form_type)
        .filter(|e| normalize_cik(&e.cik).as_deref() == Some(cik.as_str()))
        .collect();
    matching.sort_by(|a, b| b.date_filed.cmp(&a.date_filed));

    matching
        .into_iter()
        .take(limit)
        .map(|entry| FilingRef {
            cik: cik.clone(),
            company_name: entry.company_name.clone(),
            form_type: entry.form_type.clone(),
            date_filed: entry.date_filed,
            url: format!("{}/{}", ARCHIVE_BASE_URL, entry.filename.trim_start_matches('/')),
            accession_number: accession_number(&entry.filename),
        })
        .collect()
}

/// Last path segment with any `.txt` suffix removed.
fn accession_number(filename: &str) -> String {
    let segment = filename.rsplit('/').next().unwrap_or(filename);
    segment.strip_suffix(".txt").unwrap_or(segment).to_string()
}
