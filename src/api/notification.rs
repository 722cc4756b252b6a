use serde_json::Value;

use super::client::{ApiClient, ApiError};
use crate::models::notification::{MarkRead, Notification};

impl ApiClient {
    pub async fn get_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get("/notifications").await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Value, ApiError> {
        self.put(&format!("/notifications/{id}"), &MarkRead { read: true }).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<Value, ApiError> {
        self.put_empty("/notifications").await
    }
}
