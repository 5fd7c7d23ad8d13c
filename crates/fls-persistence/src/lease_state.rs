//! ---
//! fls_section: "03-persistence"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Lease-state file codec and storage bindings."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::{datetime_from_binary, datetime_to_binary, Decoder, Encoder};
use crate::{PersistenceError, Result};

/// File name of the lease table under the server's base directory.
pub const STATE_FILE_NAME: &str = "licenseServer.State";

/// One persisted lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseStateRecord {
    /// Lease identifier (`machine\user :id`).
    pub identifier: String,
    /// Renewal timestamp as stored at lease time.
    pub renewed_at: DateTime<Utc>,
    /// Holder identity of the leased license.
    pub user_id: Uuid,
}

/// Outcome of decoding a state file body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRecords {
    /// Complete records, in file order.
    pub records: Vec<LeaseStateRecord>,
    /// Bytes left over after the last complete record.
    pub trailing_bytes: usize,
}

/// Serialize records back to back with no header or terminator.
pub fn encode_records<'a, I>(records: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a LeaseStateRecord>,
{
    let mut encoder = Encoder::new();
    for record in records {
        encoder.write_string(&record.identifier)?;
        encoder.write_i64(datetime_to_binary(record.renewed_at));
        encoder.write_uuid(record.user_id);
    }
    Ok(encoder.into_bytes())
}

/// Decode records until the input runs out or stops making sense.
///
/// A partial or undecodable tail is not an error; its size is reported in
/// [`DecodedRecords::trailing_bytes`].
pub fn decode_records(bytes: &[u8]) -> DecodedRecords {
    let mut decoder = Decoder::new(bytes);
    let mut records = Vec::new();
    loop {
        let start = decoder.position();
        if decoder.remaining() == 0 {
            break;
        }
        match read_record(&mut decoder) {
            Some(record) => records.push(record),
            None => {
                return DecodedRecords {
                    records,
                    trailing_bytes: bytes.len() - start,
                }
            }
        }
    }
    DecodedRecords {
        records,
        trailing_bytes: 0,
    }
}

fn read_record(decoder: &mut Decoder<'_>) -> Option<LeaseStateRecord> {
    let identifier = decoder.read_string()?;
    let renewed_at = datetime_from_binary(decoder.read_i64()?)?;
    let user_id = decoder.read_uuid()?;
    Some(LeaseStateRecord {
        identifier,
        renewed_at,
        user_id,
    })
}

/// Handle on the lease-state file. Every save rewrites the whole file.
///
/// The handle holds an exclusive advisory lock on the file until dropped, so
/// at most one process owns a given lease table.
#[derive(Debug)]
pub struct LeaseStateFile {
    path: PathBuf,
    file: File,
}

impl LeaseStateFile {
    /// Open (creating if absent) the state file under `base_directory`.
    pub fn open(base_directory: &Path) -> Result<Self> {
        Self::open_path(base_directory.join(STATE_FILE_NAME))
    }

    /// Open (creating if absent) the state file at an explicit path.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| PersistenceError::StateFile {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| PersistenceError::StateFile {
                path: path.clone(),
                source,
            })?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                return Err(PersistenceError::Locked { path })
            }
            Err(source) => return Err(PersistenceError::StateFile { path, source }),
        }
        Ok(Self { path, file })
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete record.
    pub fn load(&self) -> Result<Vec<LeaseStateRecord>> {
        let mut bytes = Vec::new();
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_end(&mut bytes))
            .map_err(|source| self.error(source))?;
        let decoded = decode_records(&bytes);
        if decoded.trailing_bytes > 0 {
            warn!(
                path = %self.path.display(),
                trailing_bytes = decoded.trailing_bytes,
                "ignoring undecodable tail of lease state file"
            );
        }
        debug!(
            path = %self.path.display(),
            records = decoded.records.len(),
            "lease state loaded"
        );
        Ok(decoded.records)
    }

    /// Replace the file contents with `records`.
    pub fn save<'a, I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a LeaseStateRecord>,
    {
        let bytes = encode_records(records)?;
        let mut file = &self.file;
        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .map_err(|source| self.error(source))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|source| self.error(source))?;
        drop(writer);
        self.file.sync_data().map_err(|source| self.error(source))?;
        Ok(())
    }

    fn error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::StateFile {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;

    fn record(identifier: &str, minute: u32) -> LeaseStateRecord {
        LeaseStateRecord {
            identifier: identifier.to_owned(),
            renewed_at: Utc.with_ymd_and_hms(2025, 3, 4, 10, minute, 0).unwrap(),
            user_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn record_layout_is_string_ticks_guid() {
        let rec = record("PC1\\bob :x", 0);
        let bytes = encode_records([&rec]).unwrap();
        assert_eq!(bytes[0] as usize, rec.identifier.len());
        assert_eq!(bytes.len(), 1 + rec.identifier.len() + 8 + 16);
    }

    #[test]
    fn truncated_tail_is_reported_not_fatal() {
        let records = vec![record("a", 1), record("b", 2)];
        let mut bytes = encode_records(&records).unwrap();
        bytes.extend_from_slice(&[0x03, b'z', b'z']);
        let decoded = decode_records(&bytes);
        assert_eq!(decoded.records, records);
        assert_eq!(decoded.trailing_bytes, 3);

        let cut = encode_records(&records).unwrap();
        let decoded = decode_records(&cut[..cut.len() - 4]);
        assert_eq!(decoded.records.len(), 1);
        assert!(decoded.trailing_bytes > 0);
    }

    #[test]
    fn open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let file = LeaseStateFile::open(dir.path()).unwrap();
        assert!(file.path().ends_with(STATE_FILE_NAME));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn second_handle_is_refused_until_first_is_dropped() {
        let dir = tempdir().unwrap();
        let first = LeaseStateFile::open(dir.path()).unwrap();
        let err = LeaseStateFile::open(dir.path()).unwrap_err();
        assert!(matches!(err, PersistenceError::Locked { .. }));
        drop(first);
        LeaseStateFile::open(dir.path()).unwrap();
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempdir().unwrap();
        let file = LeaseStateFile::open(dir.path()).unwrap();
        file.save(&[record("a", 1), record("b", 2)]).unwrap();
        let only = record("c", 3);
        file.save([&only]).unwrap();
        assert_eq!(file.load().unwrap(), vec![only]);
    }
}
