//! "New facts available" notifications.

use tokio::sync::mpsc;

pub const NEW_FACTS_TITLE: &str = "New Facts Available!";
pub const NEW_FACTS_BODY: &str = "Check out new historical facts based on your current location.";

/// A user-facing notice that fresh facts were loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub location: String,
    pub count: usize,
}

impl Notification {
    pub fn new_facts(location: &str, count: usize) -> Self {
        Self {
            title: NEW_FACTS_TITLE.to_string(),
            body: NEW_FACTS_BODY.to_string(),
            location: location.to_string(),
            count,
        }
    }
}

/// Told whenever the fact store receives a new batch.
pub trait Notifier: Send + Sync {
    fn facts_available(&self, location: &str, count: usize);
}

/// Emits notifications as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn facts_available(&self, location: &str, count: usize) {
        let notice = Notification::new_facts(location, count);
        tracing::info!(
            location = %notice.location,
            count = notice.count,
            "{} {}",
            notice.title,
            notice.body
        );
    }
}

/// Forwards notifications to a channel, e.g. for a presentation layer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn facts_available(&self, location: &str, count: usize) {
        if self.tx.send(Notification::new_facts(location, count)).is_err() {
            tracing::debug!("Notification dropped: no listener");
        }
    }
}
