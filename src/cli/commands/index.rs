//! Master index listing.

use filingacquire::config::Settings;
use filingacquire::edgar::{master_index_url, normalize_cik};

use super::helpers::build_downloader;

pub async fn cmd_index(
    settings: &Settings,
    year: i32,
    quarter: u32,
    form: Option<&str>,
    cik: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let cik = match cik {
        Some(raw) => Some(
            normalize_cik(raw).ok_or_else(|| anyhow::anyhow!("invalid CIK: {}", raw))?,
        ),
        None => None,
    };

    let downloader = build_downloader(settings)?;
    let url = master_index_url(year, quarter);
    let entries = downloader.fetch_index(&url).await?;

    let matching: Vec<_> = entries
        .iter()
        .filter(|e| form.map_or(true, |f| e.form_type == f))
        .filter(|e| {
            cik.as_deref()
                .map_or(true, |c| normalize_cik(&e.cik).as_deref() == Some(c))
        })
        .collect();

    let shown = if limit == 0 { matching.len() } else { limit.min(matching.len()) };
    for entry in &matching[..shown] {
        println!(
            "{:>10}  {:<10}  {}  {}  {}",
            entry.cik, entry.form_type, entry.date_filed, entry.company_name, entry.filename
        );
    }
    println!(
        "\n{} of {} matching entries ({} total in {}Q{})",
        shown,
        matching.len(),
        entries.len(),
        year,
        quarter
    );
    Ok(())
}
