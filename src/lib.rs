pub mod auth;
pub mod config;
pub mod drift;
pub mod error;
pub mod output;
pub mod server;
pub mod store;
pub mod types;
pub mod validation;
