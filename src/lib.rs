//! Client for the department resource checkout service: policy resolution,
//! request validation, prioritization and overdue tracking on top of the
//! backend's REST API.

pub mod api;
pub mod app_state;
pub mod config;
pub mod engine;
pub mod models;
pub mod session;
pub mod utils;

pub use app_state::{AppError, AppState, Overview};
pub use config::Config;
