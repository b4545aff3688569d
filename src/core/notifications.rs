//! User-facing notifications
//!
//! The engine never renders anything itself; it hands notifications to a
//! [`Notifier`] and lets the front end decide how to show them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::core::error::DesignerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub auto_dismiss_ms: Option<u32>,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: Some(3000),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: None, // errors stay until dismissed
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Warning,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: Some(5000),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
            auto_dismiss_ms: Some(3000),
        }
    }

    pub fn from_error(error: &DesignerError) -> Self {
        Self::error(error.title(), error.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Sink for notifications
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to the tracing subscriber
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => {
                tracing::error!(title = %notification.title, "{}", notification.message)
            }
            NotificationKind::Warning => {
                tracing::warn!(title = %notification.title, "{}", notification.message)
            }
            NotificationKind::Success | NotificationKind::Info => {
                tracing::info!(title = %notification.title, "{}", notification.message)
            }
        }
    }
}

/// Keeps the most recent notifications in memory.
///
/// Clones share the same buffer, so a caller can hand one clone to the
/// designer and read back from the other.
#[derive(Clone, Debug)]
pub struct NotificationLog {
    entries: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<Notification> {
        match self.entries.lock() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn last(&self) -> Option<Notification> {
        self.entries().pop()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.entries().into_iter().filter(Notification::is_error).collect()
    }

    pub fn clear(&self) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ConnectionError;

    #[test]
    fn test_auto_dismiss_defaults() {
        assert_eq!(Notification::success("a", "b").auto_dismiss_ms, Some(3000));
        assert_eq!(Notification::error("a", "b").auto_dismiss_ms, None);
        assert_eq!(Notification::warning("a", "b").auto_dismiss_ms, Some(5000));
        assert_eq!(Notification::info("a", "b").auto_dismiss_ms, Some(3000));
    }

    #[test]
    fn test_from_error_uses_title() {
        let err = DesignerError::from(ConnectionError::SelfReference);
        let n = Notification::from_error(&err);
        assert_eq!(n.kind, NotificationKind::Error);
        assert_eq!(n.title, "Self reference");
        assert_eq!(n.message, "A field cannot have a reference to itself");
    }

    #[test]
    fn test_log_is_bounded_and_shared() {
        let log = NotificationLog::with_capacity(2);
        let reader = log.clone();
        log.notify(Notification::info("1", ""));
        log.notify(Notification::error("2", ""));
        log.notify(Notification::info("3", ""));

        let titles: Vec<_> = reader.entries().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, ["2", "3"]);
        assert_eq!(reader.errors().len(), 1);

        reader.clear();
        assert!(log.is_empty());
    }
}
