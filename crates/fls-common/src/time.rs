//! ---
//! fls_section: "01-core-functionality"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Shared primitives and utilities for the license server."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Wall-clock sources used for lease and expiry decisions.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current UTC instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock handle shared between owners.
pub type SharedClock = Arc<dyn Clock>;

/// The local system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Local clock corrected by the offset observed against a trusted reading.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    offset: Duration,
}

impl OffsetClock {
    /// Anchor to `trusted`, a reading taken just now from a time server.
    pub fn from_trusted(trusted: DateTime<Utc>) -> Self {
        Self::with_offset(trusted - Utc::now())
    }

    pub fn with_offset(offset: Duration) -> Self {
        Self { offset }
    }

    /// Trusted minus local.
    pub fn offset(&self) -> Duration {
        self.offset
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.offset
    }
}

/// Settable clock for deterministic tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::minutes(45));
        assert_eq!(clock.now(), start + Duration::minutes(45));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn offset_clock_tracks_trusted_reading() {
        let trusted = Utc::now() + Duration::hours(3);
        let clock = OffsetClock::from_trusted(trusted);
        let drift = clock.now() - trusted;
        assert!(drift >= Duration::zero());
        assert!(drift < Duration::seconds(5));
        assert!(clock.offset() > Duration::minutes(179));
    }
}
