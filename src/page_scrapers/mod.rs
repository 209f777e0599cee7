use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveDateTime};
use fxhash::FxHashSet;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{canonical, dates, page_source::{PageSource, SourceError}, wait};

use self::{dom::DomScraper, metadata::MetadataScraper, title::TitleScraper};

pub use self::dom::has_top_card;

pub mod dom;
pub mod metadata;
pub mod text;
pub mod title;


pub const DEFAULT_SCRAPERS: [&str; 3] = [DomScraper::NAME, MetadataScraper::NAME, TitleScraper::NAME];
pub const DEFAULT_SITE_NAME: &str = "LinkedIn";


/// Tries each scraper's `$field` in the given order and keeps the first non-empty value,
/// together with the tier that produced it. Disabled scrapers are skipped.
macro_rules! first_of {
    ($page: expr, $field: ident, $($scraper: ty),+) => {{
        let page: &PageView<'_> = $page;
        let mut found: Option<(String, ResolutionSource)> = None;
        $(
            let name = <$scraper>::NAME;
            if found.is_none() && page.state.options.enabled_scrapers.contains(name) {
                found = <$scraper>::$field(page)
                    .filter(|value| !value.is_empty())
                    .map(|value| (value, <$scraper>::SOURCE));
                if found.is_none() {
                    let field = stringify!($field);
                    debug!(scraper = name, field, "no value");
                }
            }
        )+
        found
    }};
}


/// Which strategy tier produced the title/company of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionSource {
    Dom,
    StructuredMetadata,
    TitleString,
}


/// The structured data recovered from one posting page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    /// A locality, the literal `"Remote"`, or empty when nothing on the page qualified
    pub location: String,
    pub posted_date: NaiveDate,
    /// Dedupe key of the posting
    pub canonical_url: String,
    /// Diagnostic only. `None` when neither title nor company resolved.
    pub resolution_source: Option<ResolutionSource>,
}


/// Knobs shared by every resolution
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub enabled_scrapers: FxHashSet<String>,
    /// The trailing segment of tab titles, e.g. `"LinkedIn"`
    pub site_name: String,
    pub wait_interval: Duration,
    pub wait_timeout: Duration,
}


impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            enabled_scrapers: DEFAULT_SCRAPERS.iter().map(|s| s.to_string()).collect(),
            site_name: DEFAULT_SITE_NAME.to_string(),
            wait_interval: Duration::from_millis(250),
            wait_timeout: Duration::from_secs(5),
        }
    }
}


pub struct ScraperState {
    pub html: String,
    /// The URL the page is currently showing
    pub url: String,
    pub options: Arc<ResolveOptions>,
}


impl ScraperState {
    pub fn get_scraper(&self) -> Html {
        Html::parse_document(&self.html)
    }
}


/// A parsed page, shared by every scraper during one resolution
pub struct PageView<'a> {
    pub state: &'a ScraperState,
    pub document: Html,
    /// Every JSON-LD object embedded in the page, arrays and `@graph`s flattened
    pub structured: Vec<serde_json::Value>,
}


impl<'a> PageView<'a> {
    pub fn new(state: &'a ScraperState) -> Self {
        let document = state.get_scraper();
        let structured = metadata::structured_objects(&document);
        Self { state, document, structured }
    }

    /// The document title, as a browser tab would show it
    pub fn tab_title(&self) -> String {
        dom::first_text(&self.document, &dom::DOCUMENT_TITLE).unwrap_or_default()
    }
}


pub trait PageScraper {
    const NAME: &'static str;
    const SOURCE: ResolutionSource;

    /// Returns None if this tier has no opinion about the field.
    ///
    /// Values are returned already cleaned. An empty string is treated the same as None.
    fn title(_page: &PageView<'_>) -> Option<String> {
        None
    }

    fn company(_page: &PageView<'_>) -> Option<String> {
        None
    }

    fn location(_page: &PageView<'_>) -> Option<String> {
        None
    }
}


/// Identity of the page: the current URL if it names a posting, then the page's
/// own canonical hints, then the current URL verbatim.
fn canonical_for_page(page: &PageView<'_>) -> String {
    let url = &page.state.url;
    if let Some(id) = canonical::job_id_from(url) {
        return canonical::url_for_job_id(&id);
    }
    DomScraper::identity_hints(page)
        .iter()
        .find_map(|hint| canonical::job_id_from(hint))
        .or_else(|| canonical::job_id_from_urn(&page.state.html))
        .map(|id| canonical::url_for_job_id(&id))
        .unwrap_or_else(|| url.clone())
}


/// Resolves every field of a posting from an already rendered page. Never fails.
///
/// `now` anchors relative posted dates such as `"2 days ago"`.
pub fn resolve(state: &ScraperState, now: NaiveDateTime) -> JobRecord {
    let page = PageView::new(state);

    let title = first_of!(&page, title, DomScraper, TitleScraper);
    let company = first_of!(&page, company, DomScraper, MetadataScraper, TitleScraper);
    let location = first_of!(&page, location, DomScraper, MetadataScraper);

    let resolution_source = company.as_ref().or(title.as_ref()).map(|(_, source)| *source);
    let posted_text = DomScraper::posted_text(&page).unwrap_or_default();
    let timestamp_hint = DomScraper::timestamp_hint(&page);

    JobRecord {
        title: title.map(|(value, _)| value).unwrap_or_default(),
        company: company.map(|(value, _)| value).unwrap_or_default(),
        location: location.map(|(value, _)| value).unwrap_or_default(),
        posted_date: dates::normalize_with_hint(&posted_text, timestamp_hint.as_deref(), now),
        canonical_url: canonical_for_page(&page),
        resolution_source,
    }
}


/// Waits for the top card to render, then resolves the latest snapshot.
///
/// A missing top card after the wait is not an error: the page is resolved as is.
pub async fn resolve_when_ready<S: PageSource>(
    source: &S,
    options: Arc<ResolveOptions>,
    now: NaiveDateTime,
) -> Result<JobRecord, SourceError> {
    let rendered = wait::wait_for(
        move || async move {
            match source.snapshot().await {
                Ok(snapshot) => has_top_card(&snapshot.html),
                Err(e) => {
                    debug!("snapshot not ready: {e}");
                    false
                }
            }
        },
        options.wait_interval,
        options.wait_timeout,
    )
    .await;
    if !rendered {
        warn!(url = source.url(), "top card never appeared, resolving what is there");
    }

    let snapshot = source.snapshot().await?;
    let state = ScraperState { html: snapshot.html, url: snapshot.url, options };
    Ok(tokio_rayon::spawn(move || resolve(&state, now)).await)
}
