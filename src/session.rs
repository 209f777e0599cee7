//! The three user actions, Save, Export and Clear, run against one row store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bridge::{MessageBus, NoDataReceived, PageMessage, TabId};
use crate::canonical;
use crate::page_scrapers::{self, ResolveOptions};
use crate::page_source::{fetch_page, PageSource, SourceError};
use crate::store::{ExportError, ExportFormat, RowBackend, RowStore, Schema, StoreError};


#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Open a LinkedIn job page first (/jobs/view/ or /jobs/collections/), not {0}")]
    UnsupportedPage(String),
    #[error(transparent)]
    NoDataReceived(#[from] NoDataReceived),
    #[error("A save is already in progress.")]
    Busy,
    #[error("could not read the page: {0}")]
    Source(#[from] SourceError),
    #[error("could not save the row: {0}")]
    Store(#[from] StoreError),
}


/// What a finished action reports back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Saved { count: usize },
    Exported { rows: usize, path: PathBuf },
    NothingToExport,
    Cleared,
    Count(usize),
}


impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Saved { count } => write!(f, "Saved ✓ ({count} saved)"),
            Status::Exported { rows, path } => write!(f, "Exported {rows} rows to {}.", path.display()),
            Status::NothingToExport => write!(f, "Nothing to export yet."),
            Status::Cleared => write!(f, "Cleared."),
            Status::Count(count) => write!(f, "{count} saved"),
        }
    }
}


/// Refuses anything but a posting view, before the page is read or fetched.
pub fn check_page(url: &str) -> Result<(), SaveError> {
    if canonical::is_supported_posting_url(url) {
        Ok(())
    } else {
        Err(SaveError::UnsupportedPage(url.to_string()))
    }
}


/// Resets the in-flight flag on every exit path
struct SavingGuard<'a>(&'a AtomicBool);


impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}


pub struct Session<B: RowBackend> {
    store: Mutex<RowStore<B>>,
    bus: Arc<MessageBus>,
    options: Arc<ResolveOptions>,
    reply_timeout: Duration,
    saving: AtomicBool,
    next_tab: AtomicU64,
}


impl<B: RowBackend> Session<B> {
    pub fn new(store: RowStore<B>, options: ResolveOptions, reply_timeout: Duration) -> Self {
        Self {
            store: Mutex::new(store),
            bus: MessageBus::new(),
            options: Arc::new(options),
            reply_timeout,
            saving: AtomicBool::new(false),
            next_tab: AtomicU64::new(1),
        }
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Extracts the page and adds or replaces its row.
    ///
    /// Pages that are not posting views are refused before anything runs, and
    /// only one save may be in flight at a time.
    pub async fn save<S: PageSource>(&self, source: Arc<S>) -> Result<Status, SaveError> {
        check_page(source.url())?;
        if self.saving.swap(true, Ordering::AcqRel) {
            return Err(SaveError::Busy);
        }
        let _saving = SavingGuard(&self.saving);

        info!(url = source.url(), "reading page");
        let tab: TabId = self.next_tab.fetch_add(1, Ordering::Relaxed);
        // listen before the page context starts, so the reply cannot be missed
        let reply = self.bus.subscribe(tab);

        let bus = Arc::clone(&self.bus);
        let options = Arc::clone(&self.options);
        let mut extraction = tokio::spawn(async move {
            let now = Local::now().naive_local();
            let record = page_scrapers::resolve_when_ready(&*source, options, now).await?;
            bus.post(tab, PageMessage::JobData(record));
            Ok::<_, SourceError>(())
        });

        let outcome = tokio::select! {
            record = reply.recv_within(self.reply_timeout) => record.map_err(SaveError::from),
            Ok(Err(e)) = &mut extraction => Err(SaveError::Source(e)),
        };
        extraction.abort();
        let record = outcome?;

        debug!(?record, "page resolved");
        let count = self.store.lock().await.save(record)?;
        info!(count, "saved");
        Ok(Status::Saved { count })
    }

    /// Downloads `url` and saves it. Unsupported URLs are refused without a request.
    pub async fn fetch_and_save(&self, client: &reqwest::Client, url: &str) -> Result<Status, SaveError> {
        check_page(url)?;
        let page = fetch_page(client, url).await?;
        self.save(Arc::new(page)).await
    }

    /// Writes every row to `path`. An empty store writes nothing.
    pub async fn export(&self, path: &Path, schema: Schema, format: ExportFormat) -> Result<Status, ExportError> {
        let (bytes, rows) = {
            let store = self.store.lock().await;
            match store.export(schema, format) {
                Ok(bytes) => (bytes, store.size()),
                Err(ExportError::NothingToExport) => return Ok(Status::NothingToExport),
                Err(e) => return Err(e),
            }
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, bytes).await?;
        info!(rows, path = %path.display(), "exported");
        Ok(Status::Exported { rows, path: path.to_path_buf() })
    }

    pub async fn clear(&self) -> Result<Status, StoreError> {
        self.store.lock().await.clear()?;
        info!("cleared");
        Ok(Status::Cleared)
    }

    pub async fn count(&self) -> Status {
        Status::Count(self.store.lock().await.size())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_source::{PageSnapshot, StaticPage};
    use crate::store::MemoryBackend;

    /// A tab that never finishes rendering
    struct Hung;

    impl PageSource for Hung {
        fn url(&self) -> &str {
            "https://www.linkedin.com/jobs/view/1/"
        }

        async fn snapshot(&self) -> Result<PageSnapshot, SourceError> {
            std::future::pending().await
        }
    }

    /// A tab that takes a while to render
    struct Slow(StaticPage);

    impl PageSource for Slow {
        fn url(&self) -> &str {
            &self.0.url
        }

        async fn snapshot(&self) -> Result<PageSnapshot, SourceError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.snapshot().await
        }
    }

    fn slow_page(id: u32) -> Arc<Slow> {
        Arc::new(Slow(StaticPage::new(
            format!("https://www.linkedin.com/jobs/view/{id}/"),
            "<div class='top-card-layout'><h1>Eng</h1></div>",
        )))
    }

    fn session() -> Session<MemoryBackend> {
        let options = ResolveOptions { wait_timeout: Duration::ZERO, ..ResolveOptions::default() };
        Session::new(RowStore::open(MemoryBackend::default()).unwrap(), options, Duration::from_secs(7))
    }

    #[tokio::test]
    async fn unsupported_pages_are_refused() {
        let session = session();
        let page = Arc::new(StaticPage::new("https://www.linkedin.com/feed/", "<h1>x</h1>"));
        assert!(matches!(session.save(page).await, Err(SaveError::UnsupportedPage(_))));
        assert_eq!(session.count().await, Status::Count(0));
        assert_eq!(session.bus().listener_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_urls_are_refused_before_any_request() {
        let session = session();
        let client = reqwest::Client::new();
        let result = session.fetch_and_save(&client, "http://127.0.0.1:9/feed/").await;
        assert!(matches!(result, Err(SaveError::UnsupportedPage(url)) if url == "http://127.0.0.1:9/feed/"));
        assert!(check_page("https://www.linkedin.com/jobs/collections/recommended/?currentJobId=1").is_ok());
    }

    #[tokio::test]
    async fn second_save_is_refused_while_one_is_in_flight() {
        let session = session();
        let (first, second) = tokio::join!(session.save(slow_page(1)), session.save(slow_page(2)));
        assert_eq!(first.unwrap(), Status::Saved { count: 1 });
        assert!(matches!(second, Err(SaveError::Busy)));

        assert_eq!(session.save(slow_page(2)).await.unwrap(), Status::Saved { count: 2 });
        assert_eq!(session.bus().listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_page_times_out_and_unsubscribes() {
        let session = session();
        let result = session.save(Arc::new(Hung)).await;
        assert!(matches!(result, Err(SaveError::NoDataReceived(_))));
        assert_eq!(session.bus().listener_count(), 0);
        assert_eq!(session.count().await, Status::Count(0));
    }

    #[tokio::test]
    async fn save_then_export_then_clear() {
        let session = session();
        let page = Arc::new(StaticPage::new(
            "https://www.linkedin.com/jobs/view/42/?trk=abc",
            "<title>Eng - Acme | LinkedIn</title><div class='top-card-layout'><h1>Eng</h1></div>",
        ));
        assert_eq!(session.save(page.clone()).await.unwrap(), Status::Saved { count: 1 });
        assert_eq!(session.save(page).await.unwrap(), Status::Saved { count: 1 });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applications.csv");
        let status = session.export(&path, Schema::Reduced, ExportFormat::Csv).await.unwrap();
        assert_eq!(status, Status::Exported { rows: 1, path: path.clone() });
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("\"Acme\",\"Eng\",\"https://www.linkedin.com/jobs/view/42/\"\n"));

        assert_eq!(session.clear().await.unwrap(), Status::Cleared);
        let again = dir.path().join("again.csv");
        assert_eq!(session.export(&again, Schema::Full, ExportFormat::Csv).await.unwrap(), Status::NothingToExport);
        assert!(!again.exists());
    }
}
