//! Advisory status text for hosting UIs

use tokio::sync::watch;

/// Latest progress message of a component
///
/// Every update is logged and published to subscribers. Nothing depends on
/// the text; it only exists for observability.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<String>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self { tx }
    }

    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(status = %message);
        self.tx.send_replace(message);
    }

    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

/// First `max` characters of `sql`, for status lines
pub fn truncate_query(sql: &str, max: usize) -> String {
    sql.chars().take(max).collect()
}
