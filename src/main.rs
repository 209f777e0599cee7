use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use job_rows::batch::run_batch;
use job_rows::cli::{self, Command};
use job_rows::config::load_config;
use job_rows::logging::init_logging;
use job_rows::page_source::{http_client, HtmlFile};
use job_rows::session::{SaveError, Session};
use job_rows::store::{FileBackend, RowStore};


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = cli::parse();
    init_logging(opts.verbose);

    let config = load_config(opts.config_path.as_deref())?;
    let store = RowStore::open(FileBackend::new(&config.store_path))
        .with_context(|| format!("Failed to open {}", config.store_path.display()))?;
    info!("{}", store.saved_label());
    let session = Session::new(store, config.resolve_options(), config.reply_timeout());

    match opts.command {
        Command::Save { url, html } => {
            let saved = match html {
                Some(path) => session.save(Arc::new(HtmlFile { url, path })).await,
                None => session.fetch_and_save(&http_client()?, &url).await,
            };
            match saved {
                Ok(status) => println!("{status}"),
                // recoverable by the user, reported but not fatal
                Err(e @ (SaveError::UnsupportedPage(_) | SaveError::NoDataReceived(_) | SaveError::Busy)) => {
                    println!("{e}")
                }
                Err(e) => return Err(e).context("Failed to save the row"),
            }
        }
        Command::Export { out, schema, format } => {
            let path = out.unwrap_or_else(|| config.export_path.clone());
            let status = session
                .export(&path, schema.unwrap_or(config.schema), format)
                .await
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("{status}");
        }
        Command::Clear => println!("{}", session.clear().await?),
        Command::Count => println!("{}", session.count().await),
        Command::Batch { input, max } => {
            let summary = run_batch(&session, &input, max, config.batch_delay()).await?;
            if summary.login_walled > 0 {
                warn!("{} pages needed a login; save those from a signed-in browser", summary.login_walled);
            }
            println!(
                "Batch done: {} saved, {} behind a login wall, {} failed. {}",
                summary.saved,
                summary.login_walled,
                summary.failed,
                session.count().await
            );
        }
    }

    Ok(())
}
