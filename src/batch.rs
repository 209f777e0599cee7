//! Saves every posting listed in a file, one URL per line.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use fxhash::FxHashSet;
use tracing::{info, warn};

use crate::canonical::normalize_input;
use crate::page_source::{http_client, SourceError};
use crate::session::{SaveError, Session};
use crate::store::RowBackend;


#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub saved: usize,
    pub login_walled: usize,
    pub failed: usize,
}


/// Canonical posting URLs from a URL list, first occurrence kept, in file order.
pub fn read_job_urls(text: &str, max: Option<usize>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    text.lines()
        .filter_map(normalize_input)
        .filter(|url| seen.insert(url.clone()))
        .take(max.unwrap_or(usize::MAX))
        .collect()
}


pub async fn run_batch<B: RowBackend>(
    session: &Session<B>,
    input: &Path,
    max: Option<usize>,
    delay: Duration,
) -> anyhow::Result<BatchSummary> {
    let text = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let urls = read_job_urls(&text, max);
    if urls.is_empty() {
        anyhow::bail!("No valid job URLs in {}", input.display());
    }

    let client = http_client()?;
    let mut summary = BatchSummary::default();
    for (i, url) in urls.iter().enumerate() {
        info!("[{}/{}] {url}", i + 1, urls.len());
        match session.fetch_and_save(&client, url).await {
            Ok(status) => {
                summary.saved += 1;
                info!("{status}");
            }
            Err(SaveError::Source(SourceError::LoginWall(at))) => {
                summary.login_walled += 1;
                warn!("skipped {url}: login wall at {at}");
            }
            Err(e) => {
                summary.failed += 1;
                warn!("failed {url}: {e}");
            }
        }
        if i + 1 < urls.len() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(summary)
}
