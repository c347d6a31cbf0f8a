//! Finding, downloading and listing filings.

use indicatif::{ProgressBar, ProgressStyle};

use filingacquire::config::Settings;
use filingacquire::edgar::normalize_cik;
use filingacquire::storage::FilingStore;

use super::helpers::build_downloader;

fn checked_cik(raw: &str) -> anyhow::Result<String> {
    normalize_cik(raw).ok_or_else(|| anyhow::anyhow!("invalid CIK: {}", raw))
}

pub async fn cmd_filings(
    settings: &Settings,
    cik: &str,
    years: u32,
    form: &str,
    json: bool,
) -> anyhow::Result<()> {
    let cik = checked_cik(cik)?;
    let downloader = build_downloader(settings)?;
    let filings = downloader.find_filings(&cik, years, form).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&filings)?);
        return Ok(());
    }

    if filings.is_empty() {
        println!("No {} filings found for CIK {}", form, cik);
        return Ok(());
    }
    for filing in &filings {
        println!(
            "{}  {}  {}  {}",
            filing.date_filed, filing.form_type, filing.accession_number, filing.url
        );
    }
    Ok(())
}

pub async fn cmd_download(
    settings: &Settings,
    cik: &str,
    ticker: &str,
    sector: &str,
    years: u32,
    form: &str,
) -> anyhow::Result<()> {
    let cik = checked_cik(cik)?;
    let downloader = build_downloader(settings)?;

    let filings = downloader.find_filings(&cik, years, form).await;
    if filings.is_empty() {
        println!("No {} filings found for CIK {}", form, cik);
        return Ok(());
    }

    let progress = ProgressBar::new(filings.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("█▓░"),
    );

    let mut stored = 0usize;
    for filing in &filings {
        progress.set_message(format!("{} {}", ticker, filing.date_filed));
        match downloader.download(filing, sector, ticker).await {
            Ok(locator) => {
                stored += 1;
                progress.println(format!("✓ {}", locator.path.display()));
            }
            Err(e) => progress.println(format!("✗ {}: {}", filing.accession_number, e)),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "Stored {}/{} filings for {} in {}",
        stored,
        filings.len(),
        ticker,
        settings.filings_dir.display()
    );
    Ok(())
}

pub fn cmd_stored(settings: &Settings, sector: &str, ticker: &str) -> anyhow::Result<()> {
    let store = FilingStore::new(&settings.filings_dir);
    let filings = store.list(sector, ticker)?;

    if filings.is_empty() {
        println!("No stored filings for {} in {}", ticker, sector);
        return Ok(());
    }
    for filing in &filings {
        println!(
            "{}  {:>10} bytes  fetched {}  {}",
            filing.key.date,
            filing.size,
            filing.fetched_at.format("%Y-%m-%d %H:%M"),
            filing.source_url
        );
    }
    Ok(())
}
