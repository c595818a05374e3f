//! Toast-style notifications emitted by the editor.
//!
//! Delivery and rendering belong to the host. The editor only produces
//! [`Notification`] values and hands them to a [`Notifier`].

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: SmolStr,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<SmolStr>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<SmolStr>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn success(message: impl Into<SmolStr>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn warning(message: impl Into<SmolStr>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn error(message: impl Into<SmolStr>) -> Self {
        Self::new(Level::Error, message)
    }
}

/// Sink for user-visible notifications.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Collects notifications in memory. Used by tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct NotificationLog {
    entries: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Notification> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Notifier for NotificationLog {
    fn notify(&mut self, notification: Notification) {
        self.entries.push(notification);
    }
}

/// Forwards notifications to `tracing`, for hosts without a toast surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notification: Notification) {
        let message = notification.message.as_str();
        match notification.level {
            Level::Info | Level::Success => tracing::info!(message, "notification"),
            Level::Warning => tracing::warn!(message, "notification"),
            Level::Error => tracing::error!(message, "notification"),
        }
    }
}
