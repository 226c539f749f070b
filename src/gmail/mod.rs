//! Gmail integration: OAuth, API client, query construction, utilities

pub mod auth;
pub mod client;
pub mod query;
pub mod types;
pub mod utils;
