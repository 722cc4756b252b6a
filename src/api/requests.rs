use serde_json::Value;

use super::client::{ApiClient, ApiError};
use crate::models::request::{NewRequest, Request, RequestTransition};

impl ApiClient {
    /// Requests visible to the caller, with resource and user summaries embedded.
    pub async fn get_requests(&self) -> Result<Vec<Request>, ApiError> {
        self.get("/requests").await
    }

    pub async fn create_request(&self, request: &NewRequest) -> Result<Value, ApiError> {
        self.post("/requests", request).await
    }

    /// Proposes a status change; callers refetch the collection afterwards.
    pub async fn update_request(
        &self,
        id: &str,
        transition: &RequestTransition,
    ) -> Result<Value, ApiError> {
        self.put(&format!("/requests/{id}"), transition).await
    }
}
