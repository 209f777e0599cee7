use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use validator::Validate;

use crate::page_scrapers::{ResolveOptions, DEFAULT_SCRAPERS, DEFAULT_SITE_NAME};
use crate::store::Schema;


/// Read from the working directory when no config path is given
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";


#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}


/// Everything tunable about a run. Every key may be omitted.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Where saved rows persist between runs
    pub store_path: PathBuf,
    pub export_path: PathBuf,
    pub schema: Schema,
    /// The trailing segment of tab titles on the job site.
    #[validate(length(min = 1))]
    pub site_name: String,
    /// Strategy tiers to consult. Their order is fixed regardless of this list.
    pub enabled_scrapers: Vec<String>,
    /// How often to look for the rendered top card.
    #[validate(range(min = 1))]
    pub wait_interval_ms: u64,
    /// How long to wait for the top card before resolving anyway.
    pub wait_timeout_ms: u64,
    /// How long to wait for the extraction to reply before giving up.
    #[validate(range(min = 1))]
    pub reply_timeout_ms: u64,
    /// Pause between pages in batch mode.
    pub batch_delay_ms: u64,
}


impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("job_rows.bin"),
            export_path: PathBuf::from("applications.csv"),
            schema: Schema::Full,
            site_name: DEFAULT_SITE_NAME.to_string(),
            enabled_scrapers: DEFAULT_SCRAPERS.iter().map(|s| s.to_string()).collect(),
            wait_interval_ms: 250,
            wait_timeout_ms: 5_000,
            reply_timeout_ms: 7_000,
            batch_delay_ms: 2_000,
        }
    }
}


impl Config {
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            enabled_scrapers: self.enabled_scrapers.iter().cloned().collect(),
            site_name: self.site_name.clone(),
            wait_interval: Duration::from_millis(self.wait_interval_ms),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}


pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text)?;
    config.validate()?;
    for unknown in config.enabled_scrapers.iter().filter(|s| !DEFAULT_SCRAPERS.contains(&s.as_str())) {
        warn!("unknown scraper in enabled_scrapers: {unknown}");
    }
    Ok(config)
}


/// Loads `path`, or `config.toml` if it exists, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !fallback.exists() {
                return Ok(Config::default());
            }
            fallback
        }
    };
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path: path.clone(), source })?;
    parse_config(&text)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.reply_timeout(), Duration::from_secs(7));
        assert_eq!(config.export_path, PathBuf::from("applications.csv"));
        assert_eq!(config.enabled_scrapers, vec!["dom", "metadata", "title"]);
    }

    #[test]
    fn partial_overrides() {
        let config = parse_config(
            r#"
            schema = "reduced"
            enabled_scrapers = ["dom"]
            wait_timeout_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.schema, Schema::Reduced);
        let options = config.resolve_options();
        assert!(options.enabled_scrapers.contains("dom"));
        assert!(!options.enabled_scrapers.contains("title"));
        assert_eq!(options.wait_timeout, Duration::ZERO);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(parse_config("wait_interval_ms = 0"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_toml_is_rejected() {
        assert!(matches!(parse_config("schema = 3"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Io { .. })));
    }
}
