use std::io::{self, Write};

use clap::ValueEnum;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::StoredRow;


/// Lets spreadsheet tools detect UTF-8
const BOM: &str = "\u{feff}";


#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export yet.")]
    NothingToExport,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}


/// Which columns an export carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// title, company, location, posted date, job url
    #[default]
    Full,
    /// company, title, job url
    Reduced,
}


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    /// One JSON object per line
    Jsonl,
}


impl Schema {
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Schema::Full => &["title", "company", "location", "posted date", "job url"],
            Schema::Reduced => &["company", "title", "job url"],
        }
    }

    fn fields(self, row: &StoredRow) -> Vec<&str> {
        match self {
            Schema::Full => vec![
                row.title.as_str(),
                row.company.as_str(),
                row.location.as_str(),
                row.posted_date.as_str(),
                row.canonical_url.as_str(),
            ],
            Schema::Reduced => vec![row.company.as_str(), row.title.as_str(), row.canonical_url.as_str()],
        }
    }
}


#[derive(Serialize)]
struct FullRowJson<'a> {
    title: &'a str,
    company: &'a str,
    location: &'a str,
    #[serde(rename = "posted date")]
    posted_date: &'a str,
    #[serde(rename = "job url")]
    job_url: &'a str,
}


#[derive(Serialize)]
struct ReducedRowJson<'a> {
    company: &'a str,
    title: &'a str,
    #[serde(rename = "job url")]
    job_url: &'a str,
}


/// BOM, a bare header line, then every row with each field quoted.
pub(super) fn to_csv(rows: &[StoredRow], schema: Schema) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut buf: Vec<u8> = Vec::new();
    writeln!(buf, "{BOM}{}", schema.headers().join(","))?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buf);
    for row in rows {
        writer.write_record(schema.fields(row))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}


pub(super) fn to_jsonl(rows: &[StoredRow], schema: Schema) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut buf: Vec<u8> = Vec::new();
    for row in rows {
        match schema {
            Schema::Full => serde_json::to_writer(
                &mut buf,
                &FullRowJson {
                    title: &row.title,
                    company: &row.company,
                    location: &row.location,
                    posted_date: &row.posted_date,
                    job_url: &row.canonical_url,
                },
            )?,
            Schema::Reduced => serde_json::to_writer(
                &mut buf,
                &ReducedRowJson { company: &row.company, title: &row.title, job_url: &row.canonical_url },
            )?,
        }
        buf.push(b'\n');
    }
    Ok(buf)
}
