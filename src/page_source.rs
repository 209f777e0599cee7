//! Where rendered pages come from. Stands in for the browser tab.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;


/// URL fragments of pages that demand a login instead of showing the posting
const LOGIN_WALLS: [&str; 3] = ["/authwall", "/checkpoint", "/uas/login"];
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";


#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("login wall at {0}")]
    LoginWall(String),
}


/// The document as rendered at one moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// The URL the page ended up on
    pub url: String,
    pub html: String,
}


pub trait PageSource: Send + Sync + 'static {
    /// The URL that was asked for, checked before any extraction runs
    fn url(&self) -> &str;

    /// Reads the page as it is rendered right now. May be called repeatedly while waiting.
    fn snapshot(&self) -> impl Future<Output = Result<PageSnapshot, SourceError>> + Send;
}


/// A page already in memory
#[derive(Debug, Clone)]
pub struct StaticPage {
    pub url: String,
    pub html: String,
}


impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self { url: url.into(), html: html.into() }
    }
}


impl PageSource for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn snapshot(&self) -> Result<PageSnapshot, SourceError> {
        Ok(PageSnapshot { url: self.url.clone(), html: self.html.clone() })
    }
}


/// A rendered page saved to disk. Re-read on every snapshot, so a browser may still be writing it.
#[derive(Debug, Clone)]
pub struct HtmlFile {
    pub url: String,
    pub path: PathBuf,
}


impl PageSource for HtmlFile {
    fn url(&self) -> &str {
        &self.url
    }

    async fn snapshot(&self) -> Result<PageSnapshot, SourceError> {
        let html = tokio::fs::read_to_string(&self.path).await?;
        Ok(PageSnapshot { url: self.url.clone(), html })
    }
}


pub fn http_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?)
}


/// Fetches `url` once. The returned page keeps the requested URL; where the
/// request landed only decides whether it hit a login wall.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<StaticPage, SourceError> {
    debug!(url, "fetching");
    let response = client.get(url).send().await?.error_for_status()?;
    let landed = response.url().as_str();
    if LOGIN_WALLS.iter().any(|wall| landed.contains(wall)) {
        return Err(SourceError::LoginWall(landed.to_string()));
    }
    if landed != url {
        debug!(url, landed, "redirected");
    }
    let html = response.text().await?;
    Ok(StaticPage::new(url, html))
}
