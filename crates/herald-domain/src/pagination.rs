//! Limit parameter for "latest N" list endpoints.

use serde::{Deserialize, Serialize};

/// Upper bound shared by list queries and the subscription backlog.
pub const MAX_LIMIT: u64 = 200;

/// Limit parameter for newest-first listings.
///
/// - `limit`: 1–200, default 50
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for LimitRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

impl LimitRequest {
    /// Returns the limit when it lies within 1–200, `None` otherwise.
    ///
    /// Out-of-range values are rejected rather than clamped.
    pub fn validated(self) -> Option<u64> {
        (1..=MAX_LIMIT).contains(&self.limit).then_some(self.limit)
    }
}
