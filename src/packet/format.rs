//! Recorder packet layout and field parsing
//!
//! Every record in a raw dump is a 512-byte packet. The first three bytes are
//! the header marker (two sync bytes and a kind byte); the rest depends on the
//! kind. Only data packets are decoded, positioning and auxiliary packets are
//! carried through untouched.
//!
//! ## Data Packet Layout
//!
//! ```text
//! offset  size  field
//!      0     2  sync "GP"
//!      2     1  kind (0x01 data, 0x02 position, 0x03 aux)
//!      3     1  format version
//!      4     1  sample-rate code
//!      5     1  gain codes A (hi nibble) / B (lo nibble)
//!      6     1  gain codes C (hi nibble) / D (lo nibble, unused)
//!      7     1  GPS fix quality
//!      8     3  EUI
//!     11     1  reserved
//!     12     4  ymd   (YYYYMMDD of the last PPS edge)
//!     16     4  hms   (HHMMSS of the last PPS edge)
//!     20     4  cpps  oscillator count at the PPS edge
//!     24     4  c0    oscillator count at the first sample
//!     28     4  cN    oscillator ticks per second
//!     32   480  30 x (ch0, ch1, ch2, counter) as i32
//! ```
//!
//! All multi-byte fields are little-endian.

use crate::{ConvertError, Result};

/// Size of every packet in a raw dump.
pub const PACKET_SIZE: usize = 512;
/// Size of the data packet header preceding the sample block.
pub const DATA_HEADER_SIZE: usize = 32;
/// Samples carried by one data packet.
pub const SAMPLES_PER_PACKET: usize = 30;
/// Interleaved values per sample: three measurement channels and a counter.
pub const VALUES_PER_SAMPLE: usize = 4;
/// Interleaved values carried by one data packet.
pub const VALUES_PER_PACKET: usize = SAMPLES_PER_PACKET * VALUES_PER_SAMPLE;
/// Measurement channels persisted to the sample dataset.
pub const DATA_CHANNELS: usize = 3;
/// Position of the running counter within an interleaved sample.
pub const COUNTER_CHANNEL: usize = 3;

/// Packet sync marker.
pub const SYNC: [u8; 2] = *b"GP";
pub const KIND_DATA: u8 = 0x01;
pub const KIND_POSITION: u8 = 0x02;
pub const KIND_AUX: u8 = 0x03;

pub const MIN_FORMAT_VERSION: u8 = 1;
pub const MAX_FORMAT_VERSION: u8 = 3;

/// Sample rates indexed by the header's sample-rate code.
pub const SAMPLE_RATES: [u32; 7] = [50, 100, 125, 200, 250, 500, 1000];
/// Amplifier gains indexed by a 4-bit gain code.
pub const GAINS: [f64; 8] = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];

// Header field offsets
pub(crate) const OFFSET_KIND: usize = 2;
pub(crate) const OFFSET_VERSION: usize = 3;
pub(crate) const OFFSET_SPS: usize = 4;
pub(crate) const OFFSET_GAIN_AB: usize = 5;
pub(crate) const OFFSET_GAIN_CD: usize = 6;
pub(crate) const OFFSET_GPS_FIX: usize = 7;
pub(crate) const OFFSET_EUI: usize = 8;
pub(crate) const OFFSET_YMD: usize = 12;
pub(crate) const OFFSET_HMS: usize = 16;
pub(crate) const OFFSET_CPPS: usize = 20;
pub(crate) const OFFSET_C0: usize = 24;
pub(crate) const OFFSET_CN: usize = 28;

/// A single fixed-size block read from the input.
pub type RawPacket = [u8; PACKET_SIZE];

/// Resolve a sample-rate code to samples per second.
pub fn sample_rate(code: u8) -> Result<u32> {
    SAMPLE_RATES.get(code as usize).copied().ok_or_else(|| {
        ConvertError::decode(
            "Sample rate code",
            format!("code {} is not assigned (0..{})", code, SAMPLE_RATES.len()),
        )
    })
}

/// Resolve a 4-bit gain code to its amplifier gain.
pub fn gain(code: u8) -> Result<f64> {
    GAINS.get(code as usize).copied().ok_or_else(|| {
        ConvertError::decode(
            "Gain code",
            format!("code {} is not assigned (0..{})", code, GAINS.len()),
        )
    })
}

/// Bounds-checked little-endian field readers
pub(crate) fn parse_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = data.get(offset..offset + 4).ok_or_else(|| {
        ConvertError::decode(
            "Integer parsing",
            format!(
                "Insufficient data for u32 at offset {} (need 4 bytes, have {})",
                offset,
                data.len().saturating_sub(offset)
            ),
        )
    })?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn parse_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    parse_u32_le(data, offset).map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_constants_fill_one_packet() {
        assert_eq!(VALUES_PER_PACKET, 120);
        assert_eq!(DATA_HEADER_SIZE + VALUES_PER_PACKET * 4, PACKET_SIZE);
        assert!(OFFSET_CN + 4 <= DATA_HEADER_SIZE);
    }

    #[test]
    fn code_tables_reject_unassigned_codes() {
        assert_eq!(sample_rate(1).ok(), Some(100));
        assert_eq!(gain(3).ok(), Some(8.0));
        assert!(matches!(sample_rate(7), Err(ConvertError::Decode { .. })));
        assert!(matches!(gain(15), Err(ConvertError::Decode { .. })));
    }

    #[test]
    fn field_parsing_is_bounds_checked() {
        let data = [0x78, 0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(parse_u32_le(&data, 0).ok(), Some(0x1234_5678));
        assert_eq!(parse_i32_le(&data, 4).ok(), Some(-1));
        assert!(parse_u32_le(&data, 5).is_err());
        assert!(parse_u32_le(&data, 100).is_err());
    }
}
