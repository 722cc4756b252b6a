use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// ✅ Global Config stored in `OnceLock`
static CONFIG: OnceLock<Arc<Config>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is not valid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Config already initialized")]
    AlreadyInitialized,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub token_path: PathBuf,
    pub poll_interval: Duration,
    pub policy_ttl: Duration,
    pub http_timeout: Duration,
    pub log_dir: PathBuf,
}

fn secs_var(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(key) {
        Ok(raw) => {
            let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid { key, reason: "must be greater than zero".into() });
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn default_token_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".dept-checkout")
        .join("token")
}

impl Config {
    /// ✅ Load environment variables and set defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env only once

        let api_url = env::var("CHECKOUT_API_URL")
            .map_err(|_| ConfigError::Missing("CHECKOUT_API_URL"))?;
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "CHECKOUT_API_URL",
                reason: format!("{api_url} must start with http:// or https://"),
            });
        }

        Ok(Self {
            api_url,
            token_path: env::var("CHECKOUT_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_token_path()),
            poll_interval: secs_var("CHECKOUT_POLL_SECS", 30)?,
            policy_ttl: secs_var("CHECKOUT_POLICY_TTL_SECS", 600)?,
            http_timeout: secs_var("CHECKOUT_HTTP_TIMEOUT_SECS", 30)?,
            log_dir: PathBuf::from(
                env::var("CHECKOUT_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            ),
        })
    }

    /// ✅ Initialize the global config
    pub fn init() -> Result<Arc<Config>, ConfigError> {
        let config = Arc::new(Self::from_env()?);
        CONFIG
            .set(config.clone())
            .map_err(|_| ConfigError::AlreadyInitialized)?;
        Ok(config)
    }
}
