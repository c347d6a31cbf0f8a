//! EDGAR archive conventions: index URLs, index parsing, filing selection.

mod filings;
mod index;

pub use filings::select_filings;
pub use index::{
    master_index_url, master_index_urls, parse_index_line, parse_master_index, quarter_of,
    IndexLineError, INDEX_HEADER_LINES,
};

/// Root of the public archive.
pub const ARCHIVE_BASE_URL: &str = "https://www.sec.gov/Archives";

/// Host serving the archive.
pub const ARCHIVE_HOST: &str = "www.sec.gov";

/// Annual report form type.
pub const DEFAULT_FORM_TYPE: &str = "10-K";

/// Width of a canonical, zero-padded CIK.
pub const CIK_WIDTH: usize = 10;

/// Zero-pad a CIK to 10 digits.
///
/// Returns None for empty, non-numeric, or over-long input.
pub fn normalize_cik(cik: &str) -> Option<String> {
    let cik = cik.trim();
    if cik.is_empty() || cik.len() > CIK_WIDTH || !cik.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>width$}", cik, width = CIK_WIDTH))
}
