use std::{fs, io, path::PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::{canonical, page_scrapers::{JobRecord, ResolutionSource}};

pub use self::export::{ExportError, ExportFormat, Schema};

mod export;


const STORE_VERSION: u32 = 1;


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("store file could not be encoded or decoded: {0}")]
    Codec(#[from] bitcode::Error),
    #[error("unsupported store version {0}")]
    Version(u32),
}


/// A saved posting, in the shape it is persisted and exported
#[derive(Debug, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct StoredRow {
    pub title: String,
    pub company: String,
    pub location: String,
    /// `YYYY-MM-DD`
    pub posted_date: String,
    pub canonical_url: String,
    pub resolution_source: Option<ResolutionSource>,
}


impl From<JobRecord> for StoredRow {
    fn from(value: JobRecord) -> Self {
        Self {
            title: value.title,
            company: value.company,
            location: value.location,
            posted_date: value.posted_date.format("%Y-%m-%d").to_string(),
            canonical_url: canonical::canonicalize(&value.canonical_url),
            resolution_source: value.resolution_source,
        }
    }
}


#[derive(bitcode::Encode, bitcode::Decode)]
struct StoreFile {
    version: u32,
    rows: Vec<StoredRow>,
}


/// Durable home of the rows
pub trait RowBackend {
    fn load(&mut self) -> Result<Vec<StoredRow>, StoreError>;
    fn persist(&mut self, rows: &[StoredRow]) -> Result<(), StoreError>;
}


/// Keeps rows in memory only
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    pub rows: Vec<StoredRow>,
}


impl RowBackend for MemoryBackend {
    fn load(&mut self) -> Result<Vec<StoredRow>, StoreError> {
        Ok(self.rows.clone())
    }

    fn persist(&mut self, rows: &[StoredRow]) -> Result<(), StoreError> {
        self.rows = rows.to_vec();
        Ok(())
    }
}


/// Keeps rows in a bitcode-encoded file. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileBackend {
    pub path: PathBuf,
}


impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}


impl RowBackend for FileBackend {
    fn load(&mut self) -> Result<Vec<StoredRow>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let file: StoreFile = bitcode::decode(&bytes)?;
        if file.version != STORE_VERSION {
            return Err(StoreError::Version(file.version));
        }
        Ok(file.rows)
    }

    fn persist(&mut self, rows: &[StoredRow]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = bitcode::encode(&StoreFile { version: STORE_VERSION, rows: rows.to_vec() })?;
        // write then rename, so a crash never leaves half a store
        let partial = self.path.with_extension("partial");
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &self.path)?;
        Ok(())
    }
}


/// The saved postings, one row per canonical URL, most recently saved last.
pub struct RowStore<B: RowBackend> {
    backend: B,
    rows: Vec<StoredRow>,
}


impl<B: RowBackend> RowStore<B> {
    pub fn open(mut backend: B) -> Result<Self, StoreError> {
        let rows = backend.load()?;
        debug!(rows = rows.len(), "row store opened");
        Ok(Self { backend, rows })
    }

    /// Adds the record, replacing any row with the same canonical URL.
    ///
    /// The row always lands at the end. Returns the new row count.
    pub fn save(&mut self, record: JobRecord) -> Result<usize, StoreError> {
        let row = StoredRow::from(record);
        let mut rows: Vec<StoredRow> = self
            .rows
            .iter()
            .filter(|existing| existing.canonical_url != row.canonical_url)
            .cloned()
            .collect();
        rows.push(row);

        self.backend.persist(&rows)?;
        self.rows = rows;
        Ok(self.rows.len())
    }

    /// Forgets every row. Irreversible.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.persist(&[])?;
        self.rows.clear();
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[StoredRow] {
        &self.rows
    }

    /// Text for the saved-row counter
    pub fn saved_label(&self) -> String {
        format!("{} saved", self.rows.len())
    }

    pub fn export(&self, schema: Schema, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Csv => export::to_csv(&self.rows, schema),
            ExportFormat::Jsonl => export::to_jsonl(&self.rows, schema),
        }
    }
}
