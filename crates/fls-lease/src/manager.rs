//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fls_common::time::{SharedClock, SystemClock};
use fls_licensing::{LicenseGenerator, LicenseKind, LicenseValidator};
use fls_logging::{fls_debug, fls_info, fls_warn, log_system_event, LogContext, SystemEventOutcome};
use fls_persistence::{LeaseStateFile, LeaseStateRecord};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LeaseManagerConfig;
use crate::error::{LeaseError, LeaseResult};
use crate::metrics::{LeaseMetrics, LeaseOutcome};
use crate::table::{lease_identifier, LeaseRecord, LeaseTable, LicensePool, ValidatorId};

/// Offset from `now` stamped into `renewed_at` on every grant or renewal.
pub fn renewal_offset() -> Duration {
    Duration::minutes(30)
}

/// Age of `renewed_at` after which a lease may be reclaimed; also the
/// lifetime of each minted floating license.
pub fn lease_lifetime() -> Duration {
    Duration::minutes(45)
}

/// Read-only view of one lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseView {
    pub identifier: String,
    pub renewed_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub name: String,
}

/// Point-in-time copy of the manager's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseSnapshot {
    pub available: usize,
    pub leases: Vec<LeaseView>,
}

/// Owns the license pool, the lease table, and the state file.
///
/// Not internally synchronized; wrap in [`crate::LeaseService`] to share.
pub struct LeaseManager {
    generator: LicenseGenerator,
    validators: Vec<LicenseValidator>,
    pool: LicensePool,
    table: LeaseTable,
    state: LeaseStateFile,
    clock: SharedClock,
    metrics: Option<LeaseMetrics>,
}

impl LeaseManager {
    /// Start against the system clock.
    pub fn open(config: LeaseManagerConfig) -> LeaseResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Load licenses, restore persisted leases, and take ownership of the
    /// state file.
    pub fn open_with_clock(config: LeaseManagerConfig, clock: SharedClock) -> LeaseResult<Self> {
        config.validate()?;
        let generator = LicenseGenerator::new(&config.license_server_private_key)?;

        let licenses_dir = config.licenses_directory();
        fs::create_dir_all(&licenses_dir).map_err(|source| LeaseError::LicenseDirectory {
            path: licenses_dir.clone(),
            source,
        })?;

        let mut manager = Self {
            generator,
            validators: Vec::new(),
            pool: LicensePool::new(),
            table: LeaseTable::new(),
            state: LeaseStateFile::open(config.base_directory()).map_err(LeaseError::StateFile)?,
            clock,
            metrics: None,
        };
        manager.load_licenses(&licenses_dir, &config.software_public_key)?;
        let records = manager.state.load().map_err(LeaseError::StateFile)?;
        manager.restore(records);

        log_system_event(
            None,
            "lease.startup",
            &format!(
                "{} licenses loaded, {} leases restored",
                manager.validators.len(),
                manager.table.len()
            ),
            SystemEventOutcome::Success,
        );
        Ok(manager)
    }

    /// Attach metrics and publish the current occupancy.
    pub fn with_metrics(mut self, metrics: LeaseMetrics) -> Self {
        metrics.set_occupancy(self.pool.len(), self.table.len());
        self.metrics = Some(metrics);
        self
    }

    fn load_licenses(&mut self, directory: &Path, public_key: &str) -> LeaseResult<()> {
        let entries = fs::read_dir(directory).map_err(|source| LeaseError::LicenseDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_xml(path))
            .collect();
        paths.sort();

        let now = self.clock.now();
        let mut seen = HashSet::new();
        for path in paths {
            let mut validator = LicenseValidator::new(public_key, &path);
            validator.disable_floating_licenses = true;
            if let Err(err) = validator.assert_valid_license_at(now) {
                warn!(license_path = %path.display(), error = %err, "skipping invalid license file");
                continue;
            }
            if validator.license_kind() != LicenseKind::Standard {
                debug!(
                    license_path = %path.display(),
                    kind = %validator.license_kind(),
                    "skipping non-standard license"
                );
                continue;
            }
            if !seen.insert(validator.user_id()) {
                warn!(
                    license_path = %path.display(),
                    user_id = %validator.user_id(),
                    "skipping duplicate license id"
                );
                continue;
            }
            let id = ValidatorId(self.validators.len());
            self.validators.push(validator);
            self.pool.push(id);
        }
        Ok(())
    }

    fn restore(&mut self, records: Vec<LeaseStateRecord>) {
        for record in records {
            if self.table.contains(&record.identifier) {
                debug!(identifier = %record.identifier, "dropping repeated lease record");
                continue;
            }
            let validators = &self.validators;
            let Some(id) = self
                .pool
                .take_first(|id| validators[id.index()].user_id() == record.user_id)
            else {
                debug!(
                    identifier = %record.identifier,
                    user_id = %record.user_id,
                    "dropping lease for unknown license"
                );
                continue;
            };
            self.table.insert(LeaseRecord {
                identifier: record.identifier,
                renewed_at: record.renewed_at,
                validator: id,
            });
        }
    }

    /// Lease, renew, or reclaim a license for one client.
    ///
    /// Returns the signed floating license, or `None` when every license is
    /// held by a non-stale lease.
    pub fn lease_license(
        &mut self,
        machine: &str,
        user: &str,
        id: Uuid,
    ) -> LeaseResult<Option<String>> {
        let now = self.clock.now();
        let identifier = lease_identifier(machine, user, id);
        let ctx = LogContext::new()
            .with_machine(machine)
            .with_user(user)
            .with_identifier(&identifier);

        let outcome = if self.table.contains(&identifier) {
            LeaseOutcome::Renewed
        } else if let Some(validator) = self.pool.pop() {
            self.table.insert(LeaseRecord {
                identifier: identifier.clone(),
                renewed_at: now,
                validator,
            });
            LeaseOutcome::Granted
        } else if let Some(stale) = self
            .table
            .find_stale(now, lease_lifetime())
            .map(|record| record.identifier.clone())
        {
            let Some(previous) = self.table.remove(&stale) else {
                return Ok(None);
            };
            fls_info!(context = ctx, "reclaiming stale lease {}", previous.identifier);
            self.table.insert(LeaseRecord {
                identifier: identifier.clone(),
                renewed_at: now,
                validator: previous.validator,
            });
            LeaseOutcome::Reclaimed
        } else {
            fls_warn!(context = ctx, "no license available");
            if let Some(metrics) = &self.metrics {
                metrics.record_denied();
            }
            return Ok(None);
        };

        let Some(record) = self.table.get_mut(&identifier) else {
            return Ok(None);
        };
        record.renewed_at = now + renewal_offset();
        let validator = record.validator;

        if let Err(err) = self.persist() {
            if let Some(metrics) = &self.metrics {
                metrics.record_state_write_failure();
            }
            log_system_event(
                Some(&ctx),
                "lease.persist",
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
            return Err(LeaseError::Persist(err));
        }

        let license = &self.validators[validator.index()];
        let minted = self.generator.generate(
            license.name(),
            id,
            now + lease_lifetime(),
            Some(license.license_attributes()),
            LicenseKind::Floating,
        )?;

        fls_debug!(context = ctx, "lease {outcome} for license {}", license.user_id());
        if let Some(metrics) = &self.metrics {
            metrics.record_lease(outcome);
            metrics.set_occupancy(self.pool.len(), self.table.len());
        }
        Ok(Some(minted))
    }

    fn persist(&self) -> fls_persistence::Result<()> {
        let records: Vec<LeaseStateRecord> = self
            .table
            .iter()
            .map(|record| LeaseStateRecord {
                identifier: record.identifier.clone(),
                renewed_at: record.renewed_at,
                user_id: self.validators[record.validator.index()].user_id(),
            })
            .collect();
        self.state.save(&records)
    }

    /// Licenses currently free.
    pub fn available(&self) -> usize {
        self.pool.len()
    }

    /// Holder ids of the free licenses, next-to-be-leased first.
    pub fn available_user_ids(&self) -> Vec<Uuid> {
        self.pool
            .iter()
            .rev()
            .map(|id| self.validators[id.index()].user_id())
            .collect()
    }

    /// Number of valid licenses loaded at startup.
    pub fn loaded(&self) -> usize {
        self.validators.len()
    }

    pub fn lease(&self, identifier: &str) -> Option<LeaseView> {
        self.table.get(identifier).map(|record| self.view(record))
    }

    /// Leases in table order.
    pub fn leases(&self) -> Vec<LeaseView> {
        self.table.iter().map(|record| self.view(record)).collect()
    }

    pub fn snapshot(&self) -> LeaseSnapshot {
        LeaseSnapshot {
            available: self.available(),
            leases: self.leases(),
        }
    }

    pub fn state_path(&self) -> &Path {
        self.state.path()
    }

    fn view(&self, record: &LeaseRecord) -> LeaseView {
        let validator = &self.validators[record.validator.index()];
        LeaseView {
            identifier: record.identifier.clone(),
            renewed_at: record.renewed_at,
            user_id: validator.user_id(),
            name: validator.name().to_owned(),
        }
    }
}

impl std::fmt::Debug for LeaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseManager")
            .field("loaded", &self.validators.len())
            .field("available", &self.pool.len())
            .field("leases", &self.table.len())
            .field("state", &self.state.path())
            .finish_non_exhaustive()
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
