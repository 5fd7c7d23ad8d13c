//! ---
//! fls_section: "03-persistence-logging"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Structured logging adapters and sinks."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Lease-aware logging helpers. Every event carries `machine`, `user`, and
//! `identifier` fields so lease activity can be filtered per client.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

#[doc(hidden)]
pub use tracing;

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for CLIs and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Client context attached to lease log events.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Requesting machine name.
    pub machine: Option<&'a str>,
    /// Requesting user name.
    pub user: Option<&'a str>,
    /// Lease identifier (`machine\user :id`).
    pub identifier: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the machine name.
    pub fn with_machine(mut self, machine: &'a str) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Attach the user name.
    pub fn with_user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach the lease identifier.
    pub fn with_identifier(mut self, identifier: &'a str) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a lifecycle event (startup, shutdown, scan) with its outcome.
///
/// Successes log at INFO, faults at ERROR.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    match outcome {
        SystemEventOutcome::Success => fls_info!(
            context = ctx,
            "{event}: {message} (outcome={})",
            outcome.as_str()
        ),
        SystemEventOutcome::Fault => fls_error!(
            context = ctx,
            "{event}: {message} (outcome={})",
            outcome.as_str()
        ),
    }
}
