//! [`Notifier`] implementations.

use parking_lot::Mutex;
use tracing::{error, info};

use crate::traits::{NoticeLevel, Notifier};

/// Emits notifications as log events.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        match level {
            NoticeLevel::Danger => error!(notice = text, "user notification"),
            NoticeLevel::Info | NoticeLevel::Success => {
                info!(notice = text, ?level, "user notification");
            }
        }
    }
}

/// Keeps every notification in memory, in the order sent.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        self.notices.lock().push((level, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        assert!(notifier.is_empty());

        notifier.notify(NoticeLevel::Info, "first");
        notifier.notify(NoticeLevel::Danger, "second");

        assert_eq!(
            notifier.notices(),
            vec![
                (NoticeLevel::Info, "first".to_string()),
                (NoticeLevel::Danger, "second".to_string()),
            ]
        );
    }

    #[test]
    fn tracing_notifier_accepts_every_level() {
        let notifier = TracingNotifier;
        notifier.notify(NoticeLevel::Info, "info");
        notifier.notify(NoticeLevel::Success, "saved");
        notifier.notify(NoticeLevel::Danger, "failed");
    }
}
