use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha224};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Alert;

/// Events generic enough that the summary is scanned for sub-event keywords.
const STATEMENT_EVENTS: [&str; 2] = ["Severe Weather Statement", "Special Weather Statement"];

const SUB_EVENT_KEYWORDS: [&str; 7] = [
    "Thunderstorm",
    "Strong Storm",
    "Wind",
    "Rain",
    "Hail",
    "Tornado",
    "Flood",
];

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to fetch alert feed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse alert feed: {0}")]
    Parse(#[from] quick_xml::DeError),
}

/// Client for the NOAA CAP 1.1 Atom index feed.
///
/// Each `fetch` is one snapshot of the currently active alerts, in the feed's
/// document order. No retries; a failure is the run's failure.
pub struct CapFeedClient {
    client: reqwest::Client,
    feed_url: String,
}

impl CapFeedClient {
    pub fn new(feed_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            feed_url,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<Alert>, FeedError> {
        debug!("Fetching alert feed from {}", self.feed_url);
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let feed: CapFeed = quick_xml::de::from_str(&body)?;

        let mut alerts = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            match entry_to_alert(entry) {
                Some(alert) => alerts.push(alert),
                None => warn!("Skipping feed entry with missing id, title, or event"),
            }
        }

        debug!("Feed returned {} alerts", alerts.len());
        Ok(alerts)
    }
}

// ---------------------------------------------------------------------------
// Atom/CAP wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CapFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<CapEntry>,
}

#[derive(Debug, Deserialize)]
struct CapEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<EntryLink>,
    // quick-xml's deserializer keys on element local names, so the cap:
    // prefix never shows up here.
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    expires: Option<String>,
    #[serde(default)]
    geocode: Option<Geocode>,
}

#[derive(Debug, Deserialize)]
struct EntryLink {
    #[serde(rename = "@href", default)]
    href: Option<String>,
}

/// `cap:geocode` holds alternating `valueName`/`value` children; each value is
/// a space-separated code list for the vocabulary named just before it.
#[derive(Debug, Deserialize)]
struct Geocode {
    #[serde(rename = "$value", default)]
    items: Vec<GeocodeItem>,
}

#[derive(Debug, Deserialize)]
enum GeocodeItem {
    #[serde(rename = "valueName")]
    Name(String),
    #[serde(rename = "value")]
    Value(String),
}

impl Geocode {
    fn into_code_lists(self) -> (Vec<String>, Vec<String>) {
        let mut fips = Vec::new();
        let mut ugc = Vec::new();
        let mut current: Option<String> = None;

        for item in self.items {
            match item {
                GeocodeItem::Name(name) => current = Some(name),
                GeocodeItem::Value(value) => {
                    let codes = value.split_whitespace().map(str::to_string);
                    match current.as_deref() {
                        Some("FIPS6") => fips.extend(codes),
                        Some("UGC") => ugc.extend(codes),
                        _ => {}
                    }
                }
            }
        }

        (fips, ugc)
    }
}

fn entry_to_alert(entry: CapEntry) -> Option<Alert> {
    let raw_id = entry.id?;
    let title = entry.title?;
    let event = entry.event?;

    // Identity is the digest of the Atom id, an opaque stable string from
    // here on. NOAA re-issues updates under fresh Atom ids, so an updated
    // alert notifies again.
    let id = hex::encode(Sha224::digest(raw_id.as_bytes()));

    let expires = entry.expires.as_deref().and_then(parse_cap_timestamp);
    let url = entry.links.into_iter().find_map(|l| l.href);
    let (fips_codes, ugc_codes) = entry
        .geocode
        .map(Geocode::into_code_lists)
        .unwrap_or_default();
    let details = extract_details(&event, entry.summary.as_deref());

    Some(Alert {
        id,
        event,
        title,
        summary: entry.summary,
        details,
        expires,
        url,
        fips_codes,
        ugc_codes,
    })
}

fn parse_cap_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            warn!("Unparseable cap:expires timestamp {raw:?}: {e}");
            None
        }
    }
}

/// For generic weather statements, pull recognizable sub-events out of the
/// summary so the push can say what the statement is actually about.
fn extract_details(event: &str, summary: Option<&str>) -> String {
    if !STATEMENT_EVENTS.contains(&event) {
        return String::new();
    }
    let Some(summary) = summary else {
        return String::new();
    };

    let upper = summary.to_uppercase();
    SUB_EVENT_KEYWORDS
        .iter()
        .filter(|keyword| upper.contains(&keyword.to_uppercase()))
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}
