//! ---
//! fls_section: "06-trusted-time"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "SNTP packet codec and failover client."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Trusted wall-clock time from a prioritized list of SNTP servers.
//!
//! Failures are absorbed per host; callers only see a time or its absence.

pub mod client;
pub mod error;
pub mod packet;

pub use client::{SntpClient, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_PORT};
pub use error::SntpError;
pub use packet::{client_request, parse_transmit_time, server_reply};
