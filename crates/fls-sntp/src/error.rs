//! ---
//! fls_section: "06-trusted-time"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "SNTP packet codec and failover client."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::io;

/// Why a single host attempt failed. Never escapes [`crate::SntpClient::get_date`].
#[derive(Debug, thiserror::Error)]
pub enum SntpError {
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} resolved to no addresses")]
    NoAddress(String),
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("reply of {0} bytes is shorter than an SNTP packet")]
    ShortPacket(usize),
    #[error("reply mode {0} is not server mode")]
    UnexpectedMode(u8),
    #[error("transmit timestamp is out of range")]
    Timestamp,
}
