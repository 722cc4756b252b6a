use serde_json::Value;

use super::client::{ApiClient, ApiError};
use crate::models::resource::{Resource, ResourceDraft};

impl ApiClient {
    pub async fn get_resources(&self) -> Result<Vec<Resource>, ApiError> {
        self.get("/resources").await
    }

    pub async fn create_resource(&self, draft: &ResourceDraft) -> Result<Value, ApiError> {
        self.post("/resources", draft).await
    }

    pub async fn update_resource(&self, id: &str, draft: &ResourceDraft) -> Result<Value, ApiError> {
        self.put(&format!("/resources/{id}"), draft).await
    }

    pub async fn delete_resource(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&format!("/resources/{id}")).await
    }
}
