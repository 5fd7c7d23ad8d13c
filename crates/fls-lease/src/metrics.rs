//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use strum::{AsRefStr, Display};

/// How a successful lease request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LeaseOutcome {
    /// Taken from the available pool.
    Granted,
    /// Existing lease for the same identifier.
    Renewed,
    /// Taken over from a stale lease.
    Reclaimed,
}

/// Metrics published by the lease manager.
#[derive(Clone)]
pub struct LeaseMetrics {
    leases_total: IntCounterVec,
    denied_total: IntCounter,
    available: IntGauge,
    active: IntGauge,
    state_write_failures: IntCounter,
    #[allow(dead_code)]
    registry: Arc<Registry>,
}

impl LeaseMetrics {
    /// Register all lease metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> prometheus::Result<Self> {
        let leases_total = IntCounterVec::new(
            Opts::new("fls_leases_total", "Lease requests that returned a license"),
            &["outcome"],
        )?;
        registry.register(Box::new(leases_total.clone()))?;

        let denied_total = IntCounter::with_opts(Opts::new(
            "fls_lease_denied_total",
            "Lease requests refused because no license was free or stale",
        ))?;
        registry.register(Box::new(denied_total.clone()))?;

        let available = IntGauge::with_opts(Opts::new(
            "fls_available_licenses",
            "Licenses currently in the available pool",
        ))?;
        registry.register(Box::new(available.clone()))?;

        let active = IntGauge::with_opts(Opts::new(
            "fls_active_leases",
            "Entries currently in the lease table",
        ))?;
        registry.register(Box::new(active.clone()))?;

        let state_write_failures = IntCounter::with_opts(Opts::new(
            "fls_state_write_failures_total",
            "Lease-state file writes that failed",
        ))?;
        registry.register(Box::new(state_write_failures.clone()))?;

        Ok(Self {
            leases_total,
            denied_total,
            available,
            active,
            state_write_failures,
            registry,
        })
    }

    pub fn record_lease(&self, outcome: LeaseOutcome) {
        self.leases_total
            .with_label_values(&[outcome.as_ref()])
            .inc();
    }

    pub fn record_denied(&self) {
        self.denied_total.inc();
    }

    pub fn record_state_write_failure(&self) {
        self.state_write_failures.inc();
    }

    /// Publish current pool and table sizes.
    pub fn set_occupancy(&self, available: usize, active: usize) {
        self.available.set(available as i64);
        self.active.set(active as i64);
    }
}

impl std::fmt::Debug for LeaseMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseMetrics").finish_non_exhaustive()
    }
}
