//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! In-memory lease bookkeeping: the available pool and the lease table.
//!
//! Both collections hold [`ValidatorId`]s into the manager's validator arena;
//! a given id lives in at most one of them.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

/// Index of a loaded license in the manager's validator arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorId(pub(crate) usize);

impl ValidatorId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Build the lease key for a client: `machine\user :id`.
pub fn lease_identifier(machine: &str, user: &str, id: Uuid) -> String {
    format!("{machine}\\{user} :{id}")
}

/// One outstanding lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    pub identifier: String,
    /// Stamped `now + 30min` whenever the lease is granted or renewed.
    pub renewed_at: DateTime<Utc>,
    pub validator: ValidatorId,
}

/// Insertion-ordered map from identifier to lease.
#[derive(Debug, Default, Clone)]
pub struct LeaseTable {
    records: IndexMap<String, LeaseRecord>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&LeaseRecord> {
        self.records.get(identifier)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut LeaseRecord> {
        self.records.get_mut(identifier)
    }

    /// Add a lease. Returns `false` and leaves the table untouched when the
    /// identifier is already present.
    pub fn insert(&mut self, record: LeaseRecord) -> bool {
        if self.records.contains_key(&record.identifier) {
            return false;
        }
        self.records.insert(record.identifier.clone(), record);
        true
    }

    /// Remove a lease, preserving the order of the others.
    pub fn remove(&mut self, identifier: &str) -> Option<LeaseRecord> {
        self.records.shift_remove(identifier)
    }

    /// First lease (insertion order) whose `renewed_at` is at least
    /// `threshold` in the past.
    pub fn find_stale(&self, now: DateTime<Utc>, threshold: Duration) -> Option<&LeaseRecord> {
        self.records
            .values()
            .find(|record| now - record.renewed_at >= threshold)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeaseRecord> {
        self.records.values()
    }
}

/// LIFO stack of unleased licenses.
#[derive(Debug, Default, Clone)]
pub struct LicensePool {
    stack: Vec<ValidatorId>,
}

impl LicensePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Ignored if `id` is already pooled.
    pub fn push(&mut self, id: ValidatorId) {
        if !self.stack.contains(&id) {
            self.stack.push(id);
        }
    }

    /// Most recently added license.
    pub fn pop(&mut self) -> Option<ValidatorId> {
        self.stack.pop()
    }

    /// Remove and return the first pooled id matching `predicate`.
    pub fn take_first<F>(&mut self, mut predicate: F) -> Option<ValidatorId>
    where
        F: FnMut(ValidatorId) -> bool,
    {
        let position = self.stack.iter().position(|id| predicate(*id))?;
        Some(self.stack.remove(position))
    }

    pub fn contains(&self, id: ValidatorId) -> bool {
        self.stack.contains(&id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ValidatorId> + '_ {
        self.stack.iter().copied()
    }
}
