pub mod batch;
pub mod bridge;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod dates;
pub mod logging;
pub mod page_scrapers;
pub mod page_source;
pub mod session;
pub mod store;
pub mod wait;
