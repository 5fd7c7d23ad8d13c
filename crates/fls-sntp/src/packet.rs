//! ---
//! fls_section: "06-trusted-time"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "SNTP packet codec and failover client."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! 48-byte SNTP v4 packets.

use chrono::{DateTime, Duration, Utc};

use crate::error::SntpError;

/// Size of an SNTP packet without extensions.
pub const PACKET_LEN: usize = 48;
/// LI = 0, version = 3, mode = 3 (client).
pub const CLIENT_HEADER: u8 = 0x1B;
/// Mode value of a server reply.
pub const SERVER_MODE: u8 = 4;
const TRANSMIT_OFFSET: usize = 40;
/// Seconds between 1900-01-01 and 1970-01-01.
const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

/// Build a client request.
pub fn client_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Extract the transmit timestamp from a server reply.
pub fn parse_transmit_time(reply: &[u8]) -> Result<DateTime<Utc>, SntpError> {
    if reply.len() < PACKET_LEN {
        return Err(SntpError::ShortPacket(reply.len()));
    }
    let mode = reply[0] & 0x7;
    if mode != SERVER_MODE {
        return Err(SntpError::UnexpectedMode(mode));
    }
    let seconds = read_u32(reply, TRANSMIT_OFFSET);
    let fraction = read_u32(reply, TRANSMIT_OFFSET + 4);
    let millis = u64::from(seconds) * 1000 + (u64::from(fraction) * 1000 >> 32);
    let epoch = DateTime::from_timestamp(-NTP_UNIX_OFFSET_SECS, 0).ok_or(SntpError::Timestamp)?;
    let millis = i64::try_from(millis).map_err(|_| SntpError::Timestamp)?;
    epoch
        .checked_add_signed(Duration::milliseconds(millis))
        .ok_or(SntpError::Timestamp)
}

/// Build a server reply carrying `transmit` at millisecond precision.
///
/// Used by local test servers and diagnostics.
pub fn server_reply(transmit: DateTime<Utc>) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    // LI = 0, version = 4, mode = 4; stratum 1.
    packet[0] = 0x24;
    packet[1] = 1;
    let seconds = (transmit.timestamp() + NTP_UNIX_OFFSET_SECS) as u32;
    let millis = u64::from(transmit.timestamp_subsec_millis());
    let fraction = ((millis << 32) + 999) / 1000;
    packet[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 4].copy_from_slice(&seconds.to_be_bytes());
    packet[TRANSMIT_OFFSET + 4..].copy_from_slice(&(fraction as u32).to_be_bytes());
    packet
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn request_is_48_bytes_with_client_header() {
        let packet = client_request();
        assert_eq!(packet.len(), 48);
        assert_eq!(packet[0], 0x1B);
        assert!(packet[1..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn transmit_time_is_32_32_fixed_point_since_1900() {
        let mut reply = [0u8; 48];
        reply[0] = 0x1C;
        // 2020-01-01T00:00:00Z is 3_786_825_600 seconds after 1900; half a second.
        reply[40..44].copy_from_slice(&3_786_825_600u32.to_be_bytes());
        reply[44..48].copy_from_slice(&0x8000_0000u32.to_be_bytes());
        let expected =
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(500);
        assert_eq!(parse_transmit_time(&reply).unwrap(), expected);
    }

    #[test]
    fn server_reply_survives_parsing_to_the_millisecond() {
        let instant = Utc.with_ymd_and_hms(2031, 7, 9, 13, 14, 15).unwrap()
            + Duration::milliseconds(987);
        assert_eq!(parse_transmit_time(&server_reply(instant)).unwrap(), instant);
    }

    #[test]
    fn rejects_short_and_non_server_packets() {
        assert!(matches!(
            parse_transmit_time(&[0x24; 47]),
            Err(SntpError::ShortPacket(47))
        ));
        let mut reply = server_reply(Utc::now());
        reply[0] = 0x23;
        assert!(matches!(
            parse_transmit_time(&reply),
            Err(SntpError::UnexpectedMode(3))
        ));
    }

    #[test]
    fn longer_replies_are_accepted() {
        let instant = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut reply = server_reply(instant).to_vec();
        reply.extend_from_slice(&[0u8; 20]);
        assert_eq!(parse_transmit_time(&reply).unwrap(), instant);
    }
}
