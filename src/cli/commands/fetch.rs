//! Single-URL fetch.

use std::io::Write;
use std::path::Path;

use filingacquire::config::Settings;

use super::helpers::build_fetcher;

pub async fn cmd_fetch(settings: &Settings, url: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let fetcher = build_fetcher(settings)?;
    let document = fetcher.fetch(url).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &document.body).await?;
            eprintln!(
                "Wrote {} bytes ({}) to {} ({} attempt{})",
                document.len(),
                document.content_type().unwrap_or("unknown type"),
                path.display(),
                document.attempts,
                if document.attempts == 1 { "" } else { "s" }
            );
        }
        None => {
            std::io::stdout().write_all(&document.body)?;
        }
    }
    Ok(())
}
