//! ---
//! fls_section: "03-persistence"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Lease-state file codec and storage bindings."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Primitive encoders matching .NET `BinaryWriter`/`BinaryReader`.
//!
//! Readers never panic on short input: every `read_*` returns `None` when the
//! remaining bytes cannot hold the requested field.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{PersistenceError, Result};

/// Ticks (100 ns) between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const KIND_UTC: i64 = 0x4000_0000_0000_0000;
const TICKS_MASK: i64 = 0x3FFF_FFFF_FFFF_FFFF;
/// A 32-bit length never needs more than five 7-bit groups.
const MAX_LENGTH_BYTES: usize = 5;

/// Encode an instant the way `DateTime.ToBinary()` does for a UTC value.
pub fn datetime_to_binary(instant: DateTime<Utc>) -> i64 {
    let ticks = UNIX_EPOCH_TICKS
        + instant.timestamp() * TICKS_PER_SECOND
        + i64::from(instant.timestamp_subsec_nanos() / 100);
    ticks | KIND_UTC
}

/// Decode a `DateTime.ToBinary()` value. The kind bits are ignored and the
/// ticks are read as UTC.
pub fn datetime_from_binary(raw: i64) -> Option<DateTime<Utc>> {
    let since_epoch = (raw & TICKS_MASK) - UNIX_EPOCH_TICKS;
    let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Appends .NET-compatible primitives to a byte buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    /// Start an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Length-prefixed UTF-8 string (7-bit encoded length).
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len())
            .map_err(|_| PersistenceError::Encode(format!("string of {} bytes", value.len())))?;
        let mut remaining = len;
        while remaining >= 0x80 {
            self.buffer.push((remaining as u8 & 0x7F) | 0x80);
            remaining >>= 7;
        }
        self.buffer.push(remaining as u8);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Little-endian `i64`.
    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// GUID in `Guid.ToByteArray()` order.
    pub fn write_uuid(&mut self, value: Uuid) {
        self.buffer.extend_from_slice(&value.to_bytes_le());
    }

    /// Consume the encoder.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over an encoded buffer.
#[derive(Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    /// Wrap `bytes`, starting at offset zero.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Some(slice)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Option<String> {
        let mut len: u64 = 0;
        let mut terminated = false;
        for group in 0..MAX_LENGTH_BYTES {
            let byte = self.take(1)?[0];
            len |= u64::from(byte & 0x7F) << (7 * group);
            if byte & 0x80 == 0 {
                terminated = true;
                break;
            }
        }
        if !terminated {
            return None;
        }
        let len = usize::try_from(len).ok()?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).ok()
    }

    /// Read a little-endian `i64`.
    pub fn read_i64(&mut self) -> Option<i64> {
        let raw: [u8; 8] = self.take(8)?.try_into().ok()?;
        Some(i64::from_le_bytes(raw))
    }

    /// Read a GUID stored in `Guid.ToByteArray()` order.
    pub fn read_uuid(&mut self) -> Option<Uuid> {
        let raw: [u8; 16] = self.take(16)?.try_into().ok()?;
        Some(Uuid::from_bytes_le(raw))
    }
}
