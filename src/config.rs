//! Configuration loading.
//!
//! Settings live in a TOML file next to the monitored-counties list:
//!
//! ```toml
//! [pushover]
//! token = "app-token"
//! user = "user-key"
//!
//! [events]
//! ignored = ["Frost Advisory"]
//!
//! [regions]
//! file = "counties.json"
//! ```
//!
//! The counties file is a JSON array of watched counties:
//!
//! ```json
//! [{ "name": "Arapahoe", "state": "CO", "ugc": "COC005", "fips": "008005" }]
//! ```
//!
//! Relative paths in the config resolve against the config file's own
//! directory, so the whole setup can live in one folder and the tool can be
//! invoked from anywhere.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::County;

pub const DEFAULT_FEED_URL: &str = "https://alerts.weather.gov/cap/us.php?x=1";
const DEFAULT_STORE_FILE: &str = "alerts.db";
const DEFAULT_COUNTIES_FILE: &str = "counties.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse counties file {}: {source}", path.display())]
    Counties {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("[pushover] {key} must not be empty")]
    EmptyCredential { key: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushoverConfig {
    pub token: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    pub store_path: PathBuf,
    pub ignored_events: Vec<String>,
    pub counties: Vec<County>,
    pub pushover: PushoverConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if file.pushover.token.trim().is_empty() {
            return Err(ConfigError::EmptyCredential { key: "token" });
        }
        if file.pushover.user.trim().is_empty() {
            return Err(ConfigError::EmptyCredential { key: "user" });
        }

        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let store_path = resolve(base, Path::new(&file.store.path));
        let counties_path = resolve(base, Path::new(&file.regions.file));

        let counties_raw =
            fs::read_to_string(&counties_path).map_err(|source| ConfigError::Read {
                path: counties_path.clone(),
                source,
            })?;
        let counties: Vec<County> =
            serde_json::from_str(&counties_raw).map_err(|source| ConfigError::Counties {
                path: counties_path.clone(),
                source,
            })?;

        Ok(Self {
            feed_url: file.feed.url,
            store_path,
            ignored_events: file.events.ignored,
            counties,
            pushover: file.pushover,
        })
    }
}

fn resolve(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    pushover: PushoverConfig,
    #[serde(default)]
    feed: FeedSection,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    events: EventsSection,
    #[serde(default)]
    regions: RegionsSection,
}

#[derive(Debug, Deserialize)]
struct FeedSection {
    #[serde(default = "default_feed_url")]
    url: String,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    #[serde(default = "default_store_file")]
    path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_file(),
        }
    }
}

fn default_store_file() -> String {
    DEFAULT_STORE_FILE.to_string()
}

#[derive(Debug, Default, Deserialize)]
struct EventsSection {
    #[serde(default)]
    ignored: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegionsSection {
    #[serde(default = "default_counties_file")]
    file: String,
}

impl Default for RegionsSection {
    fn default() -> Self {
        Self {
            file: default_counties_file(),
        }
    }
}

fn default_counties_file() -> String {
    DEFAULT_COUNTIES_FILE.to_string()
}
