//! Published material: tags, ministries, the contents and resources that
//! reference them, and collaboration partners.

pub mod model;
pub mod query;
pub mod routes;
pub mod service;


pub use service::{ContentService, MinistryService, PartnerService, ResourceService, TagService};
