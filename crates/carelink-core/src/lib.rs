//! carelink-core
//!
//! Shared domain model for the service directory search engine: services and
//! results, typed configuration, collaborator traits, the JSON catalog loader,
//! and the pure geo / opening-hours / eligibility helpers used while ranking.

pub mod catalog;
pub mod config;
pub mod context;
pub mod eligibility;
pub mod error;
pub mod geo;
pub mod hours;
pub mod traits;
pub mod types;
