//! User-facing transient notices (the toast channel). Views subscribe;
//! publishing with nobody listening is a no-op.

use tokio::sync::broadcast;
use tracing::debug;

const NOTICE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Broadcast bus for transient user notices
#[derive(Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
}

impl NoticeBus {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(NOTICE_CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        debug!(?level, %message, "notice");
        let _ = self.tx.send(Notice { level, message });
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notices_reach_subscribers() {
        let bus = NoticeBus::new();
        let mut rx = bus.subscribe();

        bus.success("record added");
        bus.error("failed to delete record");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, NoticeLevel::Success);
        assert_eq!(first.message, "record added");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, NoticeLevel::Error);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = NoticeBus::new();
        bus.success("nobody listening");
    }
}
