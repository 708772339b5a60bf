pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod model;
pub mod query;

#[cfg(test)]
mod tests;

pub use handlers::config;
pub use middleware::{validate_request_token, validate_setup_token};
pub use model::Claims;
