//! Token lifecycle service: issues, rotates and revokes access/refresh
//! token pairs for username/password accounts.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session_cache;
pub mod startup;
pub mod telemetry;
pub mod user_store;
pub mod validators;
