use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

use crate::db::models::{NotificationRequest, NotificationType};

#[derive(Debug, Error)]
#[error("notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Boundary to the notification transport (push/SMS/email). Dispatch is
/// best-effort: callers log failures and never propagate them into the
/// mutating operation that triggered the notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, request: NotificationRequest) -> Result<(), DispatchError>;
}

/// Default dispatcher: emits the payload as a structured log line. Stands
/// in for the real transport, which lives outside this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn dispatch(&self, request: NotificationRequest) -> Result<(), DispatchError> {
        info!(
            target_user_id = %request.target_user_id,
            notification_type = ?request.notification_type,
            priority = ?request.priority,
            title = %request.title,
            "dispatching notification"
        );
        Ok(())
    }
}

/// Captures dispatched notifications in memory. Used by the test suites
/// and handy when poking at the service locally.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }

    pub fn count_of(&self, notification_type: NotificationType) -> usize {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .iter()
            .filter(|n| n.notification_type == notification_type)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dispatch(&self, request: NotificationRequest) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push(request);
        Ok(())
    }
}
