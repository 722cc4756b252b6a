use super::client::{ApiClient, ApiError};
use crate::models::request::{OverdueCheck, Request};

impl ApiClient {
    /// Administrators only.
    pub async fn get_overdue_returns(&self) -> Result<Vec<Request>, ApiError> {
        self.get("/overdue-returns").await
    }

    pub async fn get_due_returns(&self) -> Result<Vec<Request>, ApiError> {
        self.get("/due-returns").await
    }

    /// Asks the backend to recompute overdue state and send reminders.
    pub async fn check_overdue(&self) -> Result<OverdueCheck, ApiError> {
        self.post_empty("/check-overdue").await
    }
}
