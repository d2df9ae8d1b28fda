//! Outbox relay: drains committed outbox rows into each tenant's stream key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use herald_domain::id::TenantId;

use crate::config::RelaySettings;
use crate::domain::repository::{OutboxRepository, StreamLog};
use crate::domain::types::{StreamFields, StreamKey};
use crate::error::EventsServiceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Rows appended to the log during this tick.
    pub appended: usize,
    /// Rows whose `published_at` this tick set.
    pub marked: usize,
    pub failed_tenants: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick of the same relay was still running.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FlushReport {
    appended: usize,
    marked: usize,
}

pub struct OutboxRelay<O: OutboxRepository, L: StreamLog> {
    outbox: O,
    log: L,
    settings: RelaySettings,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the tick finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<O: OutboxRepository, L: StreamLog> OutboxRelay<O, L> {
    pub fn new(outbox: O, log: L, settings: RelaySettings) -> Self {
        Self {
            outbox,
            log,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Tick every `interval` until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Ticks run inline, so one never overlaps the next; late ticks are skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            tenants = self.settings.tenants.len(),
            batch_size = self.settings.batch_size,
            interval_ms = self.settings.interval.as_millis() as u64,
            "outbox relay started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e.report(), "outbox relay tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("outbox relay stopped");
    }

    /// Flush every configured tenant concurrently and wait for all of them.
    ///
    /// A tenant whose flush fails is logged and counted; the others still run.
    pub async fn tick(&self) -> Result<TickOutcome, EventsServiceError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::warn!("outbox relay tick still in flight, skipping");
            return Ok(TickOutcome::Skipped);
        }
        let _in_flight = InFlight(&self.in_flight);

        let tenants = &self.settings.tenants;
        if tenants.is_empty() {
            return Err(EventsServiceError::NoTenantsConfigured);
        }

        let results = join_all(tenants.iter().map(|tenant| self.flush_tenant(tenant))).await;

        let mut report = TickReport::default();
        for (tenant, result) in tenants.iter().zip(results) {
            match result {
                Ok(flush) => {
                    report.appended += flush.appended;
                    report.marked += flush.marked;
                }
                Err(e) => {
                    report.failed_tenants += 1;
                    tracing::error!(tenant = %tenant, error = %e.report(), "outbox flush failed");
                }
            }
        }
        Ok(TickOutcome::Completed(report))
    }

    async fn flush_tenant(&self, tenant_id: &TenantId) -> Result<FlushReport, EventsServiceError> {
        let started = Instant::now();
        let key = StreamKey::for_tenant(tenant_id);

        let phase = Instant::now();
        let rows = self
            .outbox
            .claim_unpublished(tenant_id, self.settings.batch_size)
            .await?;
        self.warn_if_slow("select", tenant_id, phase.elapsed());

        let mut report = FlushReport::default();
        for row in &rows {
            let phase = Instant::now();
            self.log.append(&key, &StreamFields::from_outbox(row)).await?;
            self.warn_if_slow("append", tenant_id, phase.elapsed());
            report.appended += 1;

            let phase = Instant::now();
            if self.outbox.mark_published(tenant_id, row.id).await? {
                report.marked += 1;
            } else {
                tracing::debug!(tenant = %tenant_id, outbox_id = row.id, "outbox row already published");
            }
            self.warn_if_slow("mark", tenant_id, phase.elapsed());
        }

        self.warn_if_slow("flush", tenant_id, started.elapsed());
        if !rows.is_empty() {
            tracing::debug!(
                tenant = %tenant_id,
                appended = report.appended,
                marked = report.marked,
                "outbox flushed"
            );
        }
        Ok(report)
    }

    fn warn_if_slow(&self, phase: &'static str, tenant_id: &TenantId, elapsed: Duration) {
        if elapsed >= self.settings.slow_op_threshold {
            tracing::warn!(
                tenant = %tenant_id,
                phase,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow outbox operation"
            );
        }
    }
}
