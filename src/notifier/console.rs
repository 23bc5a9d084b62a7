use crate::domain::Notification;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn send(&self, notification: &Notification) {
        println!("⚠️  {} - {}", notification.title, notification.message);
        info!("Alert echoed to console: {}", notification.title);
    }
}
