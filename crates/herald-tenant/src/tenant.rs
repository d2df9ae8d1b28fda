//! Tenant identity extractor.

use axum::extract::{FromRequestParts, Query};
use http::request::Parts;
use serde::Deserialize;

use herald_core::error::AppError;
use herald_domain::id::TenantId;

/// Header carrying the tenant identity.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant identity for the current request, already validated by the edge.
///
/// Read from the `x-tenant-id` header, falling back to the `tenantId` query parameter
/// (browsers' `EventSource` cannot set headers). Returns 400 when neither carries a
/// non-blank value; the handler never runs, so no store is touched.
#[derive(Debug, Clone)]
pub struct TenantContext(pub TenantId);

#[derive(Deserialize)]
struct TenantQuery {
    #[serde(rename = "tenantId")]
    tenant_id: Option<String>,
}

const MISSING_TENANT: &str = "tenant context is required (x-tenant-id header or tenantId query)";

impl TenantContext {
    pub fn id(&self) -> &TenantId {
        &self.0
    }

    pub fn into_inner(self) -> TenantId {
        self.0
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // Extract synchronously and return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let from_header = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<TenantId>().ok());

        let tenant = from_header.or_else(|| {
            Query::<TenantQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.tenant_id)
                .and_then(|s| s.parse::<TenantId>().ok())
        });

        async move {
            let tenant = tenant.ok_or(AppError::BadRequest(MISSING_TENANT))?;
            Ok(Self(tenant))
        }
    }
}
