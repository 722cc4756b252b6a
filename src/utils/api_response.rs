use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Error envelope returned by the checkout backend on non-2xx responses.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Message shown to the user for a failed call: the backend's `error` field,
/// `HTTP <code>` when the body is JSON without one, `Network error` when the
/// body is not JSON at all.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .or(parsed.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        Err(_) => "Network error".to_string(),
    }
}
