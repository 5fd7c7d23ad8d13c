//! ---
//! fls_section: "03-persistence"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Lease-state file codec and storage bindings."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Persistence for the lease table: a flat binary record stream compatible
//! with .NET `BinaryWriter` output.

use std::path::PathBuf;

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors that carry no path context.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// IO failure against a specific state file.
    #[error("failed to access state file {path}: {source}")]
    StateFile {
        /// File being read or written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Another process holds the state file lock.
    #[error("state file {path} is locked by another lease server")]
    Locked {
        /// File whose lock is held.
        path: PathBuf,
    },
    /// A record field exceeds what the binary layout can express.
    #[error("record cannot be encoded: {0}")]
    Encode(String),
}

pub mod codec;
pub mod lease_state;

pub use codec::{datetime_from_binary, datetime_to_binary};
pub use lease_state::{
    decode_records, encode_records, DecodedRecords, LeaseStateFile, LeaseStateRecord,
    STATE_FILE_NAME,
};
