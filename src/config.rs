//! Runtime configuration, read from the environment (and `.env`).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::preloader::{DEFAULT_DEBOUNCE, DEFAULT_MAX_CONCURRENT, PreloadSettings};

pub const SOURCE_KEY: &str = "SCREENFLOW_SOURCE";
pub const VERSION_KEY: &str = "SCREENFLOW_VERSION";
pub const CONCURRENCY_KEY: &str = "SCREENFLOW_PRELOAD_CONCURRENCY";
pub const DEBOUNCE_KEY: &str = "SCREENFLOW_PRELOAD_DEBOUNCE_MS";

const DEFAULT_SOURCE_DIR: &str = "./static";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Where flow documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Base URL; documents live at `<base>/static/<version>/data.json`.
    Http(String),
    /// Directory; documents live at `<dir>/<version>/data.json`.
    Directory(PathBuf),
}

impl SourceLocation {
    fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Http(raw.to_string())
        } else {
            SourceLocation::Directory(PathBuf::from(raw))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: SourceLocation,
    pub version: u32,
    pub preload: PreloadSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceLocation::Directory(PathBuf::from(DEFAULT_SOURCE_DIR)),
            version: 1,
            preload: PreloadSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = lookup(SOURCE_KEY)
            .filter(|raw| !raw.trim().is_empty())
            .map_or_else(
                || Config::default().source,
                |raw| SourceLocation::parse(raw.trim()),
            );

        let version = parse_or(&lookup, VERSION_KEY, 1u32)?;
        let max_concurrent = parse_or(&lookup, CONCURRENCY_KEY, DEFAULT_MAX_CONCURRENT)?;
        if max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                key: CONCURRENCY_KEY,
                value: max_concurrent.to_string(),
            });
        }
        let debounce_ms = parse_or(
            &lookup,
            DEBOUNCE_KEY,
            DEFAULT_DEBOUNCE.as_millis() as u64,
        )?;

        Ok(Self {
            source,
            version,
            preload: PreloadSettings {
                max_concurrent,
                debounce: Duration::from_millis(debounce_ms),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.preload.max_concurrent, 3);
        assert_eq!(config.preload.debounce, Duration::from_millis(500));
    }

    #[test]
    fn reads_http_source_and_overrides() {
        let config = Config::from_lookup(lookup(&[
            (SOURCE_KEY, "https://flows.example.com"),
            (VERSION_KEY, "2"),
            (CONCURRENCY_KEY, "5"),
            (DEBOUNCE_KEY, " 120 "),
        ]))
        .unwrap();

        assert_eq!(
            config.source,
            SourceLocation::Http("https://flows.example.com".into())
        );
        assert_eq!(config.version, 2);
        assert_eq!(config.preload.max_concurrent, 5);
        assert_eq!(config.preload.debounce, Duration::from_millis(120));
    }

    #[test]
    fn directory_source_for_plain_paths() {
        let config = Config::from_lookup(lookup(&[(SOURCE_KEY, "/srv/flows")])).unwrap();
        assert_eq!(config.source, SourceLocation::Directory("/srv/flows".into()));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[(VERSION_KEY, "latest")])).unwrap_err(),
            ConfigError::Invalid {
                key: VERSION_KEY,
                value: "latest".into()
            }
        );
        assert!(Config::from_lookup(lookup(&[(CONCURRENCY_KEY, "0")])).is_err());
    }
}
