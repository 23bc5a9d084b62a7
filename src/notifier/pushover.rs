use crate::config::PushoverConfig;
use crate::domain::Notification;
use tracing::info;

use super::NotifyError;

pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Thin client for the Pushover message API.
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    token: String,
    user: String,
    api_url: String,
    client: reqwest::Client,
}

impl PushoverNotifier {
    pub fn new(credentials: &PushoverConfig) -> Self {
        Self::with_api_url(credentials, PUSHOVER_API_URL)
    }

    /// Point the notifier at a different endpoint. Tests aim it at a mock
    /// server.
    pub fn with_api_url(credentials: &PushoverConfig, api_url: impl Into<String>) -> Self {
        Self {
            token: credentials.token.clone(),
            user: credentials.user.clone(),
            api_url: api_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut form = vec![
            ("token", self.token.as_str()),
            ("user", self.user.as_str()),
            ("title", notification.title.as_str()),
            ("message", notification.message.as_str()),
            ("sound", "falling"),
        ];
        if let Some(url) = &notification.url {
            form.push(("url", url.as_str()));
        }

        let response = self.client.post(&self.api_url).form(&form).send().await?;

        if response.status().is_success() {
            info!("Push sent: {}", notification.title);
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(NotifyError::Delivery { status, body })
        }
    }
}
