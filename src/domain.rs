use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One severe-weather notice from the CAP feed.
///
/// `id` is the stable identity used for dedupe: the hex SHA-224 digest of the
/// Atom entry id, computed by the feed client. Everything downstream treats it
/// as an opaque string.
#[derive(Debug, Clone)]
pub struct Alert {
    pub id: String,
    pub event: String,
    pub title: String,
    pub summary: Option<String>,
    /// Sub-event keywords extracted from generic weather statements,
    /// e.g. "Hail, Wind". Empty for ordinary alerts.
    pub details: String,
    pub expires: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub fips_codes: Vec<String>,
    pub ugc_codes: Vec<String>,
}

impl Alert {
    /// Last five characters of the identity digest, used to keep repeated
    /// pushes for re-issued events distinguishable on a phone screen.
    pub fn short_id(&self) -> &str {
        let start = self.id.len().saturating_sub(5);
        &self.id[start..]
    }
}

/// A monitored county, loaded from the counties JSON file.
///
/// `ugc` and `fips` are the two code vocabularies NOAA attaches to an alert;
/// a county matches on either. Codes are strings so FIPS leading zeros
/// survive ("008005").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct County {
    pub name: String,
    pub state: String,
    pub ugc: String,
    pub fips: String,
}

/// Payload handed to the notifiers.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, url: Option<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            url,
            timestamp: Utc::now(),
        }
    }

    /// Compose the push for an alert matched to one of our counties.
    ///
    /// Title reads like "Arapahoe (CO) Weather Alert". The message is the
    /// feed's own headline with any sub-event details spliced in after the
    /// event name, suffixed with the short id.
    pub fn for_alert(alert: &Alert, county: &County) -> Self {
        let title = format!("{} ({}) Weather Alert", county.name, county.state);

        let headline = if alert.details.is_empty() {
            alert.title.clone()
        } else {
            alert
                .title
                .replace("issued", &format!("({}) issued", alert.details))
        };

        let message = format!("{} ({})", headline, alert.short_id());
        Self::new(title, message, alert.url.clone())
    }
}
