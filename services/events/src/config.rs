use std::time::Duration;

use serde::Deserialize;

use herald_core::config::Config;
use herald_core::tracing::LogFormat;
use herald_domain::id::TenantId;

use crate::error::EventsServiceError;

/// Events service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// TCP port for the HTTP server (default 8080). Env var: `EVENTS_PORT`.
    #[serde(default = "default_port")]
    pub events_port: u16,
    /// Comma-separated tenant allowlist drained by the relay. Env var: `TENANT_IDS`.
    #[serde(default)]
    pub tenant_ids: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub outbox_batch_size: u64,
    #[serde(default = "default_interval_ms")]
    pub outbox_interval_ms: u64,
    #[serde(default = "default_slow_op_threshold_ms")]
    pub slow_op_threshold_ms: u64,
    /// `json` (default) or `text`. Env var: `LOG_FORMAT`.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config for EventsConfig {}

fn default_port() -> u16 {
    8080
}

fn default_batch_size() -> u64 {
    500
}

fn default_interval_ms() -> u64 {
    500
}

fn default_slow_op_threshold_ms() -> u64 {
    500
}

/// Validated relay parameters.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub tenants: Vec<TenantId>,
    pub batch_size: u64,
    pub interval: Duration,
    pub slow_op_threshold: Duration,
}

impl EventsConfig {
    pub fn relay_settings(&self) -> Result<RelaySettings, EventsServiceError> {
        let tenants = parse_tenants(&self.tenant_ids)?;
        if self.outbox_batch_size == 0 {
            return Err(anyhow::anyhow!("OUTBOX_BATCH_SIZE must be greater than 0").into());
        }
        if self.outbox_interval_ms == 0 {
            return Err(anyhow::anyhow!("OUTBOX_INTERVAL_MS must be greater than 0").into());
        }
        Ok(RelaySettings {
            tenants,
            batch_size: self.outbox_batch_size,
            interval: Duration::from_millis(self.outbox_interval_ms),
            slow_op_threshold: Duration::from_millis(self.slow_op_threshold_ms),
        })
    }
}

/// Trim entries and drop blanks; an empty result is an error.
pub fn parse_tenants(raw: &[String]) -> Result<Vec<TenantId>, EventsServiceError> {
    let tenants: Vec<TenantId> = raw.iter().filter_map(|t| t.parse().ok()).collect();
    if tenants.is_empty() {
        return Err(EventsServiceError::NoTenantsConfigured);
    }
    Ok(tenants)
}
