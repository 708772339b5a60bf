//! File uploads into the configured object storage.

pub mod handlers;
pub mod model;

pub use handlers::config;
