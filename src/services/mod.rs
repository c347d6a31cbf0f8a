//! Services combining fetching and storage.

mod download;

pub use download::{DownloadError, DownloadResult, FilingDownloader};
