pub mod api_response;
pub mod notification;
pub mod policy_cache;
