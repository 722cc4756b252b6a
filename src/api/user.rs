use super::client::{ApiClient, ApiError};
use crate::models::user::User;

impl ApiClient {
    pub async fn get_users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/users").await
    }
}
