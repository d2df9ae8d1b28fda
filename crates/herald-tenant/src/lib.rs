//! Tenant context shared across Herald services.
//!
//! Provides the `TenantContext` extractor used by every tenant-scoped endpoint.

pub mod tenant;
