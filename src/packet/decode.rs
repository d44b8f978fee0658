//! Data packet decoding
//!
//! [`PacketDecoder`] is the seam between the demultiplexer and the bit-level
//! packet format. [`RecorderDecoder`] implements it for the layout documented
//! in [`format`](super::format).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::format::{
    self, DATA_HEADER_SIZE, KIND_DATA, MAX_FORMAT_VERSION, MIN_FORMAT_VERSION, OFFSET_C0,
    OFFSET_CN, OFFSET_CPPS, OFFSET_EUI, OFFSET_GAIN_AB, OFFSET_GAIN_CD, OFFSET_GPS_FIX,
    OFFSET_HMS, OFFSET_KIND, OFFSET_SPS, OFFSET_VERSION, OFFSET_YMD, RawPacket,
    VALUES_PER_PACKET, parse_i32_le, parse_u32_le,
};
use crate::{ConvertError, Result};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Per-packet GPS fix metadata, one row per accepted packet in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixMetadata {
    pub gps_fix: u32,
    pub ymd: u32,
    pub hms: u32,
    pub cpps: u32,
    pub c0: u32,
    pub cn: u32,
}

/// A fully decoded data packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDataRecord {
    pub format_version: u8,
    pub sample_rate_code: u8,
    /// Samples per second resolved from `sample_rate_code`
    pub sample_rate: u32,
    /// Gain codes for channels A, B, C
    pub gain_codes: [u8; 3],
    /// Gains resolved from `gain_codes`
    pub gains: [f64; 3],
    pub eui: [u8; 3],
    pub fix: FixMetadata,
    /// 30 samples of (ch0, ch1, ch2, counter), sample-major
    pub samples: [i32; VALUES_PER_PACKET],
    /// Absolute time of the first sample, nanoseconds since the Unix epoch (UTC)
    pub first_sample_ns: i64,
}

impl DecodedDataRecord {
    /// Upper-case hex rendering of the hardware identity, e.g. `0A1B2C`.
    pub fn eui_hex(&self) -> String {
        self.eui.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

/// Turns a classified data packet into a structured record.
pub trait PacketDecoder {
    fn decode(&self, packet: &RawPacket) -> Result<DecodedDataRecord>;
}

/// Decoder for the field recorder's native packet layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderDecoder;

impl PacketDecoder for RecorderDecoder {
    fn decode(&self, packet: &RawPacket) -> Result<DecodedDataRecord> {
        if packet[OFFSET_KIND] != KIND_DATA {
            return Err(ConvertError::decode(
                "Packet kind",
                format!(
                    "expected data kind {:#04x}, found {:#04x}",
                    KIND_DATA, packet[OFFSET_KIND]
                ),
            ));
        }

        let format_version = packet[OFFSET_VERSION];
        if !(MIN_FORMAT_VERSION..=MAX_FORMAT_VERSION).contains(&format_version) {
            return Err(ConvertError::decode(
                "Format version",
                format!(
                    "version {} unsupported ({}..={})",
                    format_version, MIN_FORMAT_VERSION, MAX_FORMAT_VERSION
                ),
            ));
        }

        let sample_rate_code = packet[OFFSET_SPS];
        let sample_rate = format::sample_rate(sample_rate_code)?;

        let gain_codes = [
            (packet[OFFSET_GAIN_AB] >> 4) & 0x0f,
            packet[OFFSET_GAIN_AB] & 0x0f,
            (packet[OFFSET_GAIN_CD] >> 4) & 0x0f,
        ];
        let gains = [
            format::gain(gain_codes[0])?,
            format::gain(gain_codes[1])?,
            format::gain(gain_codes[2])?,
        ];

        let eui = [packet[OFFSET_EUI], packet[OFFSET_EUI + 1], packet[OFFSET_EUI + 2]];

        let fix = FixMetadata {
            gps_fix: u32::from(packet[OFFSET_GPS_FIX]),
            ymd: parse_u32_le(packet, OFFSET_YMD)?,
            hms: parse_u32_le(packet, OFFSET_HMS)?,
            cpps: parse_u32_le(packet, OFFSET_CPPS)?,
            c0: parse_u32_le(packet, OFFSET_C0)?,
            cn: parse_u32_le(packet, OFFSET_CN)?,
        };

        let first_sample_ns = first_sample_time(&fix)?;

        let mut samples = [0i32; VALUES_PER_PACKET];
        for (i, slot) in samples.iter_mut().enumerate() {
            *slot = parse_i32_le(packet, DATA_HEADER_SIZE + i * 4)?;
        }

        trace!(
            "Decoded data packet: version={}, sps={}, ymd={}, hms={}, t0={}",
            format_version, sample_rate, fix.ymd, fix.hms, first_sample_ns
        );

        Ok(DecodedDataRecord {
            format_version,
            sample_rate_code,
            sample_rate,
            gain_codes,
            gains,
            eui,
            fix,
            samples,
            first_sample_ns,
        })
    }
}

/// Absolute time of the PPS edge described by decimal `YYYYMMDD` / `HHMMSS`.
pub fn pps_instant_ns(ymd: u32, hms: u32) -> Result<i64> {
    let date = NaiveDate::from_ymd_opt((ymd / 10_000) as i32, (ymd / 100) % 100, ymd % 100)
        .ok_or_else(|| ConvertError::decode("Fix date", format!("invalid ymd {}", ymd)))?;
    let instant = date
        .and_hms_opt(hms / 10_000, (hms / 100) % 100, hms % 100)
        .ok_or_else(|| ConvertError::decode("Fix time", format!("invalid hms {:06}", hms)))?;

    instant.and_utc().timestamp_nanos_opt().ok_or_else(|| {
        ConvertError::decode("Fix time", format!("{} {:06} is out of range", ymd, hms))
    })
}

/// First-sample time: PPS instant plus the oscillator ticks elapsed since it.
fn first_sample_time(fix: &FixMetadata) -> Result<i64> {
    if fix.cn == 0 {
        return Err(ConvertError::decode("Clock calibration", "cN is zero ticks per second"));
    }

    let pps = pps_instant_ns(fix.ymd, fix.hms)?;
    let ticks = i64::from(fix.c0.wrapping_sub(fix.cpps));
    let offset_ns = ticks * NANOS_PER_SECOND / i64::from(fix.cn);

    pps.checked_add(offset_ns)
        .ok_or_else(|| ConvertError::decode("Clock calibration", "first sample time overflows"))
}
