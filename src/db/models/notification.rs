use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    JobScheduled,
    JobStartReminder,
    LatenessAlert,
    RescheduleRequested,
    RescheduleApproved,
    RescheduleRejected,
    JobStarted,
    JobCompleted,
    JobCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Push,
    Sms,
    Email,
}

/// Payload handed to the notification dispatcher. Delivery is best-effort
/// and asynchronous; transport lives behind the `Notifier` trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub target_user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub priority: NotificationPriority,
    /// `None` lets the dispatcher pick its default channel set.
    pub channels: Option<Vec<NotificationChannel>>,
}
