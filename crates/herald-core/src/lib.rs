//! Cross-cutting plumbing shared by Herald services: configuration loading,
//! error responses, health probes, request-id middleware, tracing setup and
//! the tenant-scoped transaction helper.

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod tracing;
