use serde_json::Value;
use tracing::info;

use super::client::{ApiClient, ApiError};
use crate::models::user::{LoginRequest, LoginResponse, SignupRequest};

impl ApiClient {
    /// `POST /signup`; the new account still has to log in afterwards.
    pub async fn signup(&self, payload: &SignupRequest) -> Result<Value, ApiError> {
        let created = self.post("/signup", payload).await?;
        info!("Account created for {}", payload.email);
        Ok(created)
    }

    /// `POST /login`, returns the bearer token for the session.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post("/login", credentials).await
    }
}
