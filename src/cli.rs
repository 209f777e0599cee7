use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::store::{ExportFormat, Schema};


#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Optional path to config file (TOML). Defaults to ./config.toml when present
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log strategy fall-through and other detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}


#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract the posting at URL and add or replace its row
    #[command(alias = "save-row")]
    Save {
        /// The posting view the page shows (/jobs/view/ or /jobs/collections/)
        #[arg(long)]
        url: String,
        /// A saved, rendered copy of the page. Fetched from URL when omitted
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Write every saved row to a file
    #[command(alias = "export-csv")]
    Export {
        /// Output file (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Column set (overrides config)
        #[arg(long, value_enum)]
        schema: Option<Schema>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
    /// Forget every saved row
    #[command(alias = "clear-rows")]
    Clear,
    /// Show how many rows are saved
    Count,
    /// Fetch and save every posting listed in a file, one URL per line
    Batch {
        #[arg(long = "in")]
        input: PathBuf,
        /// Process only the first N URLs
        #[arg(long)]
        max: Option<usize>,
    },
}


pub fn parse() -> CliOptions {
    CliOptions::parse()
}
