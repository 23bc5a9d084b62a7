use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::Notification;
use crate::feed::CapFeedClient;
use crate::filter::RegionFilter;
use crate::notifier::NotifierHub;
use crate::store::{SeenStore, StoreError};

/// Counters for one polling cycle, logged by the entry point.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub swept: usize,
    pub fetched: usize,
    pub matched: usize,
    pub ignored: usize,
    pub already_seen: usize,
    pub notified: usize,
    pub failed: usize,
}

pub struct Stormwatch {
    feed: CapFeedClient,
    filter: RegionFilter,
    store: SeenStore,
    notifier: NotifierHub,
    ignored_events: Vec<String>,
    dry_run: bool,
}

impl Stormwatch {
    pub fn new(
        feed: CapFeedClient,
        filter: RegionFilter,
        store: SeenStore,
        notifier: NotifierHub,
        ignored_events: Vec<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            feed,
            filter,
            store,
            notifier,
            ignored_events,
            dry_run,
        }
    }

    /// One full cycle: sweep stale records, fetch the feed, push whatever is
    /// new for the watched counties.
    ///
    /// An alert is marked seen only after its push went through, so a
    /// delivery failure leaves it eligible for retry on the next cycle. In
    /// dry-run mode matches are echoed to the console and nothing is
    /// recorded.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        let cutoff = Utc::now() - Duration::hours(24);
        report.swept = self.store.delete_expired(cutoff)?;
        if report.swept > 0 {
            info!("🧹 Swept {} expired alert records", report.swept);
        }

        let alerts = self.feed.fetch().await?;
        report.fetched = alerts.len();
        info!("📡 Fetched {} active alerts", report.fetched);

        for alert in &alerts {
            let Some(county) = self.filter.match_county(alert) else {
                continue;
            };
            report.matched += 1;

            if self.ignored_events.iter().any(|e| e == &alert.event) {
                debug!("Ignoring {} for {} County", alert.event, county.name);
                report.ignored += 1;
                continue;
            }

            if self.store.exists(&alert.id)? {
                debug!("Already seen: {} ({})", alert.event, alert.short_id());
                report.already_seen += 1;
                continue;
            }

            let notification = Notification::for_alert(alert, county);
            match self.notifier.send(&notification).await {
                Ok(()) => {
                    report.notified += 1;
                    if !self.dry_run {
                        match self.store.record(&alert.id, Utc::now(), alert.expires) {
                            Ok(()) => {}
                            Err(StoreError::DuplicateRecord(_)) => {
                                debug!("Alert {} was already recorded", alert.short_id());
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "⚠️  Push failed for {} ({}): {}",
                        alert.event,
                        alert.short_id(),
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PushoverConfig;
    use crate::domain::County;
    use crate::feed::FeedError;
    use crate::notifier::{ConsoleNotifier, PushoverNotifier};
    use mockito::{Matcher, Server, ServerGuard};

    const TORNADO_ID: &str = "a241c02d1a8a41d398939aed009a2dc7f045d5a3c7c5bb89594f40fd";
    const HAIL_ID: &str = "804ab4a0d89b0c373f4f784315bba45cfd15049a2b83b6d7f48b070b";

    fn counties() -> Vec<County> {
        vec![County {
            name: "Adams".to_string(),
            state: "CO".to_string(),
            ugc: "COC001".to_string(),
            fips: "008001".to_string(),
        }]
    }

    fn entry(id: &str, event: &str, title: &str, fips: &str, ugc: &str) -> String {
        // Expiry rides a day ahead of now, clear of the sweep cutoff.
        let expires = (Utc::now() + Duration::days(1)).to_rfc3339();
        format!(
            "<entry>\
             <id>{id}</id>\
             <title>{title}</title>\
             <summary>issued by NWS</summary>\
             <link href=\"https://alerts.weather.gov/cap/wwacapget.php?x={id}\"/>\
             <cap:event>{event}</cap:event>\
             <cap:expires>{expires}</cap:expires>\
             <cap:geocode>\
             <valueName>FIPS6</valueName><value>{fips}</value>\
             <valueName>UGC</valueName><value>{ugc}</value>\
             </cap:geocode>\
             </entry>"
        )
    }

    fn feed_body(entries: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <feed xmlns=\"http://www.w3.org/2005/Atom\" \
             xmlns:cap=\"urn:oasis:names:tc:emergency:cap:1.1\">\
             <title>Current Watches, Warnings and Advisories</title>{}</feed>",
            entries.join("")
        )
    }

    async fn mock_feed(server: &mut ServerGuard, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/feed.xml")
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(body)
            .create_async()
            .await
    }

    fn pushover(server: &ServerGuard) -> PushoverNotifier {
        PushoverNotifier::with_api_url(
            &PushoverConfig {
                token: "t".to_string(),
                user: "u".to_string(),
            },
            format!("{}/push", server.url()),
        )
    }

    fn watcher(
        feed_url: String,
        store: SeenStore,
        push: Option<PushoverNotifier>,
        ignored_events: Vec<String>,
        dry_run: bool,
    ) -> Stormwatch {
        Stormwatch::new(
            CapFeedClient::new(feed_url),
            RegionFilter::new(&counties()),
            store,
            NotifierHub::new(ConsoleNotifier::new(), push),
            ignored_events,
            dry_run,
        )
    }

    #[tokio::test]
    async fn first_sighting_is_pushed_and_recorded() {
        let mut feed_server = Server::new_async().await;
        let mut push_server = Server::new_async().await;

        let body = feed_body(&[
            entry(
                "tornado-1",
                "Tornado Warning",
                "Tornado Warning issued May 10",
                "008001",
                "COC001",
            ),
            entry(
                "elsewhere-1",
                "Flood Warning",
                "Flood Warning issued May 10",
                "048001",
                "TXC001",
            ),
        ]);
        let _feed = mock_feed(&mut feed_server, &body).await;
        let push = push_server
            .mock("POST", "/push")
            .match_body(Matcher::UrlEncoded(
                "title".into(),
                "Adams (CO) Weather Alert".into(),
            ))
            .with_status(200)
            .with_body(r#"{"status":1}"#)
            .expect(1)
            .create_async()
            .await;

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::in_memory().unwrap(),
            Some(pushover(&push_server)),
            vec![],
            false,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.matched, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(report.failed, 0);
        assert!(watcher.store.exists(TORNADO_ID).unwrap());
        push.assert_async().await;
    }

    #[tokio::test]
    async fn recorded_alert_is_not_pushed_again() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("alerts.db");
        SeenStore::create(&db).unwrap();

        let mut feed_server = Server::new_async().await;
        let body = feed_body(&[entry(
            "tornado-1",
            "Tornado Warning",
            "Tornado Warning issued May 10",
            "008001",
            "COC001",
        )]);
        let _feed = mock_feed(&mut feed_server, &body).await;

        let mut push_server = Server::new_async().await;
        let first_push = push_server
            .mock("POST", "/push")
            .with_status(200)
            .with_body(r#"{"status":1}"#)
            .expect(1)
            .create_async()
            .await;
        let first = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::open(&db).unwrap(),
            Some(pushover(&push_server)),
            vec![],
            false,
        );
        first.run().await.unwrap();
        first_push.assert_async().await;

        // Same feed again: the record suppresses the push.
        let mut quiet_server = Server::new_async().await;
        let no_push = quiet_server
            .mock("POST", "/push")
            .expect(0)
            .create_async()
            .await;
        let second = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::open(&db).unwrap(),
            Some(pushover(&quiet_server)),
            vec![],
            false,
        );
        let report = second.run().await.unwrap();
        assert_eq!(report.already_seen, 1);
        assert_eq!(report.notified, 0);
        no_push.assert_async().await;
    }

    #[tokio::test]
    async fn alerts_outside_watched_counties_are_skipped() {
        let mut feed_server = Server::new_async().await;
        let body = feed_body(&[entry(
            "elsewhere-1",
            "Flood Warning",
            "Flood Warning issued May 10",
            "048001",
            "TXC001",
        )]);
        let _feed = mock_feed(&mut feed_server, &body).await;

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::in_memory().unwrap(),
            None,
            vec![],
            false,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.matched, 0);
        assert_eq!(report.notified, 0);
        assert_eq!(watcher.store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_county_list_matches_nothing() {
        let mut feed_server = Server::new_async().await;
        let body = feed_body(&[entry(
            "tornado-1",
            "Tornado Warning",
            "Tornado Warning issued May 10",
            "008001",
            "COC001",
        )]);
        let _feed = mock_feed(&mut feed_server, &body).await;

        let watcher = Stormwatch::new(
            CapFeedClient::new(format!("{}/feed.xml", feed_server.url())),
            RegionFilter::new(&[]),
            SeenStore::in_memory().unwrap(),
            NotifierHub::new(ConsoleNotifier::new(), None),
            vec![],
            false,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.matched, 0);
        assert_eq!(report.notified, 0);
    }

    #[tokio::test]
    async fn feed_failure_aborts_without_recording_anything() {
        let mut feed_server = Server::new_async().await;
        let _feed = feed_server
            .mock("GET", "/feed.xml")
            .with_status(503)
            .create_async()
            .await;

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::in_memory().unwrap(),
            None,
            vec![],
            false,
        );

        let err = watcher.run().await.unwrap_err();
        assert!(err.downcast_ref::<FeedError>().is_some());
        assert_eq!(watcher.store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_push_stays_eligible_for_retry() {
        let mut feed_server = Server::new_async().await;
        let body = feed_body(&[
            entry(
                "tornado-1",
                "Tornado Warning",
                "Tornado Warning issued May 10",
                "008001",
                "COC001",
            ),
            entry(
                "hail-2",
                "Severe Thunderstorm Warning",
                "Severe Thunderstorm Warning issued May 10",
                "008001",
                "COC001",
            ),
        ]);
        let _feed = mock_feed(&mut feed_server, &body).await;

        let mut push_server = Server::new_async().await;
        let _fail = push_server
            .mock("POST", "/push")
            .match_body(Matcher::UrlEncoded(
                "message".into(),
                "Tornado Warning issued May 10 (f40fd)".into(),
            ))
            .with_status(500)
            .with_body("server error")
            .create_async()
            .await;
        let _ok = push_server
            .mock("POST", "/push")
            .match_body(Matcher::UrlEncoded(
                "message".into(),
                "Severe Thunderstorm Warning issued May 10 (b070b)".into(),
            ))
            .with_status(200)
            .with_body(r#"{"status":1}"#)
            .create_async()
            .await;

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::in_memory().unwrap(),
            Some(pushover(&push_server)),
            vec![],
            false,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.matched, 2);
        assert_eq!(report.notified, 1);
        assert_eq!(report.failed, 1);
        // The failed alert stays unseen and gets retried next cycle.
        assert!(!watcher.store.exists(TORNADO_ID).unwrap());
        assert!(watcher.store.exists(HAIL_ID).unwrap());
    }

    #[tokio::test]
    async fn ignored_events_are_skipped_before_push() {
        let mut feed_server = Server::new_async().await;
        let mut push_server = Server::new_async().await;
        let body = feed_body(&[entry(
            "frost-1",
            "Frost Advisory",
            "Frost Advisory issued May 10",
            "008001",
            "COC001",
        )]);
        let _feed = mock_feed(&mut feed_server, &body).await;
        let no_push = push_server
            .mock("POST", "/push")
            .expect(0)
            .create_async()
            .await;

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::in_memory().unwrap(),
            Some(pushover(&push_server)),
            vec!["Frost Advisory".to_string()],
            false,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.notified, 0);
        assert_eq!(watcher.store.count().unwrap(), 0);
        no_push.assert_async().await;
    }

    #[tokio::test]
    async fn dry_run_previews_without_recording() {
        let mut feed_server = Server::new_async().await;
        let body = feed_body(&[entry(
            "dry-1",
            "Tornado Warning",
            "Tornado Warning issued May 10",
            "008001",
            "COC001",
        )]);
        let _feed = mock_feed(&mut feed_server, &body).await;

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            SeenStore::in_memory().unwrap(),
            None,
            vec![],
            true,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(watcher.store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_records_are_swept_at_run_start() {
        let mut feed_server = Server::new_async().await;
        let _feed = mock_feed(&mut feed_server, &feed_body(&[])).await;

        let store = SeenStore::in_memory().unwrap();
        let now = Utc::now();
        store
            .record("stale", now - Duration::days(3), Some(now - Duration::days(2)))
            .unwrap();
        store
            .record("active", now, Some(now + Duration::hours(1)))
            .unwrap();

        let watcher = watcher(
            format!("{}/feed.xml", feed_server.url()),
            store,
            None,
            vec![],
            false,
        );

        let report = watcher.run().await.unwrap();
        assert_eq!(report.swept, 1);
        assert!(!watcher.store.exists("stale").unwrap());
        assert!(watcher.store.exists("active").unwrap());
    }
}
