//! ---
//! fls_section: "01-core-functionality"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Shared primitives and utilities for the license server."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Core shared primitives for the FLS workspace.
//! This crate exposes configuration loading, tracing bootstrap, and the
//! clock abstraction consumed by the lease manager and the CLI.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, KeyConfig, LicensingConfig, LoadedAppConfig, LoggingConfig, TimeConfig};
pub use logging::{init_tracing, LogFormat};
pub use time::{Clock, ManualClock, OffsetClock, SharedClock, SystemClock};
