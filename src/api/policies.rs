use serde_json::Value;

use super::client::{ApiClient, ApiError};
use crate::models::analytics::StakeholderAnalytics;
use crate::models::policy::PolicyTable;

impl ApiClient {
    pub async fn get_stakeholder_policies(&self) -> Result<PolicyTable, ApiError> {
        self.get("/stakeholder-policies").await
    }

    pub async fn update_stakeholder_policies(&self, table: &PolicyTable) -> Result<Value, ApiError> {
        self.put("/stakeholder-policies", table).await
    }

    pub async fn get_stakeholder_analytics(&self) -> Result<StakeholderAnalytics, ApiError> {
        self.get("/stakeholder-analytics").await
    }
}
