mod console;
mod pushover;

pub use console::ConsoleNotifier;
pub use pushover::{PushoverNotifier, PUSHOVER_API_URL};

use crate::domain::Notification;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("push provider rejected the notification ({status}): {body}")]
    Delivery {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Fans a notification out to every configured channel. The console echo
/// always happens; Pushover delivery only when a notifier is present (dry
/// runs leave it out). A Pushover failure propagates so the caller can
/// keep the alert unrecorded and retry it next cycle.
pub struct NotifierHub {
    console: ConsoleNotifier,
    pushover: Option<PushoverNotifier>,
}

impl NotifierHub {
    pub fn new(console: ConsoleNotifier, pushover: Option<PushoverNotifier>) -> Self {
        Self { console, pushover }
    }

    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.console.send(notification);

        if let Some(pushover) = &self.pushover {
            pushover.send(notification).await?;
        }

        Ok(())
    }
}
