//! On-disk store for fetched filings.
//!
//! Layout: `{root}/{category}/{entity}/{period}/{entity}_{date}.txt`, with a
//! JSON metadata sidecar next to each document. Writes for an existing key
//! replace the previous document wholesale.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Errors from filing storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no stored filing at {0}")]
    NotFound(PathBuf),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid filing metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Composite key of a stored filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingKey {
    pub category: String,
    pub entity: String,
    pub period: String,
    pub date: NaiveDate,
}

impl FilingKey {
    pub fn new(
        category: impl Into<String>,
        entity: impl Into<String>,
        period: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            category: category.into(),
            entity: entity.into(),
            period: period.into(),
            date,
        }
    }

    /// Key for an annual filing, grouped by the year it was filed.
    pub fn annual(category: impl Into<String>, entity: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(category, entity, date.year().to_string(), date)
    }

    fn relative_dir(&self) -> PathBuf {
        PathBuf::from(sanitize_component(&self.category))
            .join(sanitize_component(&self.entity))
            .join(sanitize_component(&self.period))
    }

    fn file_stem(&self) -> String {
        format!("{}_{}", sanitize_component(&self.entity), self.date.format("%Y-%m-%d"))
    }
}

/// Where a filing lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingLocator {
    pub key: FilingKey,
    pub path: PathBuf,
}

impl FilingLocator {
    fn metadata_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }
}

/// Metadata sidecar written alongside each filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFiling {
    #[serde(flatten)]
    pub key: FilingKey,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
    pub size: u64,
}

/// Filesystem-backed filing store.
#[derive(Debug, Clone)]
pub struct FilingStore {
    root: PathBuf,
}

impl FilingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the locator for `key` without touching the filesystem.
    pub fn locate(&self, key: &FilingKey) -> FilingLocator {
        let path = self
            .root
            .join(key.relative_dir())
            .join(format!("{}.txt", key.file_stem()));
        FilingLocator {
            key: key.clone(),
            path,
        }
    }

    /// Write (or overwrite) the filing for `key`.
    ///
    /// The document is written to a temporary file in the target directory
    /// and renamed into place, so readers never observe a partial file.
    pub fn write(
        &self,
        key: &FilingKey,
        source_url: &str,
        content: &[u8],
    ) -> StoreResult<FilingLocator> {
        let locator = self.locate(key);
        let dir = locator
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        write_atomic(&dir, &locator.path, content)?;

        let meta = StoredFiling {
            key: key.clone(),
            source_url: source_url.to_string(),
            fetched_at: Utc::now(),
            size: content.len() as u64,
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;
        write_atomic(&dir, &locator.metadata_path(), &meta_json)?;

        debug!(
            "Stored filing {} ({} bytes)",
            locator.path.display(),
            content.len()
        );
        Ok(locator)
    }

    /// Read a previously written filing.
    pub fn read(&self, locator: &FilingLocator) -> StoreResult<Vec<u8>> {
        match fs::read(&locator.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(locator.path.clone()))
            }
            Err(e) => Err(io_error(&locator.path)(e)),
        }
    }

    pub fn read_to_string(&self, locator: &FilingLocator) -> StoreResult<String> {
        let bytes = self.read(locator)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the metadata sidecar for a filing.
    pub fn read_meta(&self, locator: &FilingLocator) -> StoreResult<StoredFiling> {
        let path = locator.metadata_path();
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path));
            }
            Err(e) => return Err(io_error(&path)(e)),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn exists(&self, key: &FilingKey) -> bool {
        self.locate(key).path.is_file()
    }

    /// All stored filings for an entity, newest first.
    ///
    /// Unreadable metadata sidecars are skipped with a warning.
    pub fn list(&self, category: &str, entity: &str) -> StoreResult<Vec<StoredFiling>> {
        let entity_dir = self
            .root
            .join(sanitize_component(category))
            .join(sanitize_component(entity));

        let periods = match fs::read_dir(&entity_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&entity_dir)(e)),
        };

        let mut filings = Vec::new();
        for period in periods {
            let period = period.map_err(io_error(&entity_dir))?;
            let period_dir = period.path();
            if !period_dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&period_dir).map_err(io_error(&period_dir))? {
                let path = entry.map_err(io_error(&period_dir))?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let parsed = fs::read(&path)
                    .map_err(io_error(&path))
                    .and_then(|raw| Ok(serde_json::from_slice::<StoredFiling>(&raw)?));
                match parsed {
                    Ok(meta) => filings.push(meta),
                    Err(e) => warn!("Skipping unreadable filing metadata {}: {}", path.display(), e),
                }
            }
        }

        filings.sort_by(|a, b| b.key.date.cmp(&a.key.date));
        Ok(filings)
    }
}

fn write_atomic(dir: &Path, target: &Path, content: &[u8]) -> StoreResult<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    tmp.write_all(content).map_err(io_error(tmp.path()))?;
    tmp.persist(target).map_err(|e| StoreError::Io {
        path: target.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Make a key component safe to use as a single path segment.
fn sanitize_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_layout() {
        let store = FilingStore::new("/filings");
        let key = FilingKey::annual("Information Technology", "AAPL", date("2023-11-03"));
        let locator = store.locate(&key);
        assert_eq!(
            locator.path,
            PathBuf::from("/filings/Information Technology/AAPL/2023/AAPL_2023-11-03.txt")
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let store = FilingStore::new(dir.path());
        let key = FilingKey::annual("Tech", "ACME", date("2023-02-01"));

        let locator = store
            .write(&key, "https://www.sec.gov/Archives/a.txt", b"annual report")
            .unwrap();
        assert_eq!(store.read(&locator).unwrap(), b"annual report");
        assert!(store.exists(&key));

        let meta = store.read_meta(&locator).unwrap();
        assert_eq!(meta.key, key);
        assert_eq!(meta.source_url, "https://www.sec.gov/Archives/a.txt");
        assert_eq!(meta.size, 13);
    }

    #[test]
    fn test_rewrite_overwrites() {
        let dir = tempdir().unwrap();
        let store = FilingStore::new(dir.path());
        let key = FilingKey::annual("Tech", "ACME", date("2023-02-01"));

        store.write(&key, "u1", b"first version").unwrap();
        let locator = store.write(&key, "u2", b"second").unwrap();

        assert_eq!(store.read_to_string(&locator).unwrap(), "second");
        assert_eq!(store.read_meta(&locator).unwrap().source_url, "u2");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FilingStore::new(dir.path());
        let locator = store.locate(&FilingKey::annual("Tech", "NOPE", date("2020-01-01")));

        assert!(matches!(store.read(&locator), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.read_meta(&locator),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempdir().unwrap();
        let store = FilingStore::new(dir.path());
        for d in ["2021-10-29", "2023-11-03", "2022-10-28"] {
            let key = FilingKey::annual("Tech", "AAPL", date(d));
            store.write(&key, "u", d.as_bytes()).unwrap();
        }

        let dates: Vec<NaiveDate> = store
            .list("Tech", "AAPL")
            .unwrap()
            .into_iter()
            .map(|f| f.key.date)
            .collect();
        assert_eq!(dates, vec![date("2023-11-03"), date("2022-10-28"), date("2021-10-29")]);
        assert!(store.list("Tech", "MSFT").unwrap().is_empty());
    }

    #[test]
    fn test_components_cannot_escape_root() {
        let store = FilingStore::new("/filings");
        let key = FilingKey::new("..", "a/b", "2023", date("2023-01-01"));
        let locator = store.locate(&key);
        assert!(locator.path.starts_with("/filings"));
        assert_eq!(
            locator.path,
            PathBuf::from("/filings/_/a_b/2023/a_b_2023-01-01.txt")
        );
    }
}
