//! Tenant identity helpers for integration tests.
//!
//! Requests reaching a service carry the tenant in `x-tenant-id`. `MockTenant` builds
//! that header (or the `tenantId` query form used by `EventSource` clients) directly.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use herald_domain::id::TenantId;
use herald_tenant::tenant::TENANT_HEADER;

/// Configurable tenant identity injected into test requests.
pub struct MockTenant {
    pub tenant_id: TenantId,
}

impl MockTenant {
    /// Panics on a blank id.
    pub fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.parse().expect("tenant id must not be blank"),
        }
    }

    pub fn header_name() -> HeaderName {
        HeaderName::from_static(TENANT_HEADER)
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(self.tenant_id.as_str()).expect("tenant id is a valid header value")
    }

    /// Return headers as if the edge injected them.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(Self::header_name(), self.header_value());
        map
    }

    /// `tenantId=<id>` query pair.
    pub fn query(&self) -> (&'static str, &str) {
        ("tenantId", self.tenant_id.as_str())
    }
}
