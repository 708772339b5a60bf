//! Organization members, their positions, and the aggregated views built
//! from them.
//!
//! - `aggregate` - generation discovery, grouping by position, tree rebuild
//! - `repository` - storage port and its document store implementation
//! - `service` - validation and orchestration over a repository
//! - `routes` - HTTP handlers and the read cache they share

pub mod aggregate;
pub mod cache;
pub mod model;
pub mod repository;
pub mod routes;
pub mod service;

#[cfg(test)]
mod tests;

pub use cache::MemberCache;
pub use repository::{DocumentMemberRepository, MemberRepository};
pub use service::MemberService;
