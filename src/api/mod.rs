pub mod auth;
pub mod client;
pub mod notification;
pub mod policies;
pub mod requests;
pub mod resources;
pub mod returns;
pub mod user;

pub use client::{ApiClient, ApiError};
