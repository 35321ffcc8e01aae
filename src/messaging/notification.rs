// Notifications - Non-fatal errors reported from the timing loop
//
// The scheduler and the controller never let a per-beat failure escape.
// They hand it to a `Notifier`, which logs it and, when a consumer is
// attached, queues a `Notification` for the UI side.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use ringbuf::traits::Producer;

use crate::messaging::channels::NotificationProducer;
use crate::sequencer::MetronomeError;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Area that raised the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Timing,
    Audio,
    Settings,
    Generic,
}

/// Notification with timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    pub timestamp: u64, // Unix timestamp in milliseconds
}

impl Notification {
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            level,
            category,
            message,
            timestamp,
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }

    /// Build the notification for a recovered metronome error
    pub fn from_error(error: &MetronomeError) -> Self {
        let (level, category) = match error {
            MetronomeError::UnknownSubdivision(_) => {
                (NotificationLevel::Warning, NotificationCategory::Timing)
            }
            MetronomeError::CallbackFailure { .. } => {
                (NotificationLevel::Error, NotificationCategory::Timing)
            }
            MetronomeError::AudioBackendUnavailable(_) => {
                (NotificationLevel::Error, NotificationCategory::Audio)
            }
            MetronomeError::UnknownSound(_) => {
                (NotificationLevel::Warning, NotificationCategory::Audio)
            }
            MetronomeError::InvalidArgument(_) | MetronomeError::InvalidPattern(_) => {
                (NotificationLevel::Warning, NotificationCategory::Generic)
            }
        };
        Self::new(level, category, error.to_string())
    }
}

/// Reporting handle shared by the scheduler and the controller
///
/// Cloning is cheap; all clones push into the same queue.
#[derive(Clone, Default)]
pub struct Notifier {
    tx: Option<Arc<Mutex<NotificationProducer>>>,
}

impl Notifier {
    /// Notifier that only logs
    pub fn silent() -> Self {
        Self::default()
    }

    /// Notifier that logs and forwards to a notification queue
    pub fn new(tx: NotificationProducer) -> Self {
        Self {
            tx: Some(Arc::new(Mutex::new(tx))),
        }
    }

    /// Log and queue a notification (dropped if the queue is full)
    pub fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => {
                log::info!(target: "metronome::notify", "{}", notification.message)
            }
            NotificationLevel::Warning => {
                log::warn!(target: "metronome::notify", "{}", notification.message)
            }
            NotificationLevel::Error => {
                log::error!(target: "metronome::notify", "{}", notification.message)
            }
        }

        if let Some(tx) = &self.tx
            && let Ok(mut tx) = tx.try_lock()
        {
            let _ = tx.try_push(notification);
        }
    }

    /// Report a recovered error
    pub fn report(&self, error: &MetronomeError) {
        self.notify(Notification::from_error(error));
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("attached", &self.tx.is_some())
            .finish()
    }
}
