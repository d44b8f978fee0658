//! Session accumulation and clock-drift detection
//!
//! [`SessionState`] holds every growing column for one conversion run. Columns
//! grow in lock-step: each accepted data packet appends 120 interleaved sample
//! values, one row to each metadata column and one timestamp. The device
//! identity is captured from the first accepted packet and never reassigned.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::packet::format::{PACKET_SIZE, SAMPLES_PER_PACKET, VALUES_PER_PACKET};
use crate::packet::{DecodedDataRecord, RawPacket};

/// Packet-to-packet tolerance in sample periods: one packet plus one sample of jitter.
pub const DRIFT_TOLERANCE_SAMPLES: u32 = SAMPLES_PER_PACKET as u32 + 1;

/// Device identity and calibration, captured once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Upper-case hex hardware identity
    pub eui: String,
    pub sample_rate: u32,
    /// Gains for channels A, B, C
    pub gains: [f64; 3],
    pub format_version: u8,
    /// Largest inter-packet gap accepted without a timing anomaly
    pub expected_packet_interval_ns: i64,
}

impl DeviceIdentity {
    fn from_record(record: &DecodedDataRecord) -> Self {
        Self {
            eui: record.eui_hex(),
            sample_rate: record.sample_rate,
            gains: record.gains,
            format_version: record.format_version,
            expected_packet_interval_ns: expected_packet_interval_ns(record.sample_rate),
        }
    }

    /// Seconds between consecutive samples
    pub fn sample_interval_seconds(&self) -> f64 {
        1.0 / f64::from(self.sample_rate)
    }
}

/// Inter-packet gap tolerance for a sample rate, in nanoseconds.
pub fn expected_packet_interval_ns(sample_rate: u32) -> i64 {
    let sample_interval_seconds = 1.0 / f64::from(sample_rate);
    (sample_interval_seconds * f64::from(DRIFT_TOLERANCE_SAMPLES) * 1e9).round() as i64
}

/// An inter-packet gap larger than the expected packet interval.
///
/// Advisory only: the packet is still accumulated as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingAnomaly {
    /// Index of the packet among accepted data packets
    pub packet_index: u64,
    pub previous_ns: i64,
    pub current_ns: i64,
    pub delta_ns: i64,
    pub tolerance_ns: i64,
}

impl fmt::Display for TimingAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packet {} time skip: t0 {} previous {} dt {} ns (tolerance {} ns)",
            self.packet_index, self.current_ns, self.previous_ns, self.delta_ns, self.tolerance_ns
        )
    }
}

/// Per-packet metadata columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataColumns {
    pub gps_fix: Vec<u32>,
    pub ymd: Vec<u32>,
    pub hms: Vec<u32>,
    pub cpps: Vec<u32>,
    pub c0: Vec<u32>,
    pub cn: Vec<u32>,
}

impl MetadataColumns {
    fn with_capacity(rows: usize) -> Self {
        Self {
            gps_fix: Vec::with_capacity(rows),
            ymd: Vec::with_capacity(rows),
            hms: Vec::with_capacity(rows),
            cpps: Vec::with_capacity(rows),
            c0: Vec::with_capacity(rows),
            cn: Vec::with_capacity(rows),
        }
    }

    fn push(&mut self, record: &DecodedDataRecord) {
        self.gps_fix.push(record.fix.gps_fix);
        self.ymd.push(record.fix.ymd);
        self.hms.push(record.fix.hms);
        self.cpps.push(record.fix.cpps);
        self.c0.push(record.fix.c0);
        self.cn.push(record.fix.cn);
    }

    /// Columns with their container dataset names, in write order.
    pub fn named(&self) -> [(&'static str, &[u32]); 6] {
        [
            ("ymd", self.ymd.as_slice()),
            ("hms", self.hms.as_slice()),
            ("gpsfix", self.gps_fix.as_slice()),
            ("cpps", self.cpps.as_slice()),
            ("c0", self.c0.as_slice()),
            ("cN", self.cn.as_slice()),
        ]
    }
}

/// All accumulated state for one conversion run.
#[derive(Debug, Default)]
pub struct SessionState {
    samples: Vec<i32>,
    metadata: MetadataColumns,
    timestamps: Vec<i64>,
    identity: Option<DeviceIdentity>,
    last_timestamp: Option<i64>,
    position_raw: Vec<u8>,
    aux_raw: Vec<u8>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the columns for a dump of `blocks` packets.
    ///
    /// Every block is assumed to be a data packet, which overestimates when
    /// the dump also carries positioning or auxiliary packets.
    pub fn with_capacity(blocks: usize) -> Self {
        Self {
            samples: Vec::with_capacity(blocks * VALUES_PER_PACKET),
            metadata: MetadataColumns::with_capacity(blocks),
            timestamps: Vec::with_capacity(blocks),
            ..Self::default()
        }
    }

    /// Accumulate a decoded data packet.
    ///
    /// Returns a [`TimingAnomaly`] when the gap to the previous accepted packet
    /// exceeds the expected packet interval. The record is appended either way.
    pub fn accept(&mut self, record: &DecodedDataRecord) -> Option<TimingAnomaly> {
        let packet_index = self.timestamps.len() as u64;

        if self.identity.is_none() {
            let identity = DeviceIdentity::from_record(record);
            debug!(
                "Captured device identity: eui={}, version={}, sps={}, dtsamp={}s, tolerance={}ns, gains={:?}",
                identity.eui,
                identity.format_version,
                identity.sample_rate,
                identity.sample_interval_seconds(),
                identity.expected_packet_interval_ns,
                identity.gains
            );
            self.identity = Some(identity);
        }

        let current = record.first_sample_ns;
        let anomaly = match (self.last_timestamp, &self.identity) {
            (Some(previous), Some(identity)) => {
                let delta_ns = current.saturating_sub(previous);
                let tolerance_ns = identity.expected_packet_interval_ns;
                (delta_ns.unsigned_abs() > tolerance_ns.unsigned_abs()).then_some(TimingAnomaly {
                    packet_index,
                    previous_ns: previous,
                    current_ns: current,
                    delta_ns,
                    tolerance_ns,
                })
            }
            _ => None,
        };
        if let Some(anomaly) = &anomaly {
            warn!("{}", anomaly);
        }

        self.last_timestamp = Some(current);
        self.metadata.push(record);
        self.samples.extend_from_slice(&record.samples);
        self.timestamps.push(current);

        anomaly
    }

    /// Append a positioning packet verbatim.
    pub fn push_position(&mut self, packet: &RawPacket) {
        self.position_raw.extend_from_slice(packet);
    }

    /// Append an auxiliary packet verbatim.
    pub fn push_aux(&mut self, packet: &RawPacket) {
        self.aux_raw.extend_from_slice(packet);
    }

    /// Number of accepted data packets
    pub fn accepted_packets(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of samples (rows of the sample dataset)
    pub fn sample_count(&self) -> usize {
        self.accepted_packets() * SAMPLES_PER_PACKET
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Interleaved `(ch0, ch1, ch2, counter)` sample values
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn metadata(&self) -> &MetadataColumns {
        &self.metadata
    }

    /// First-sample timestamps, one per accepted packet
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn position_raw(&self) -> &[u8] {
        &self.position_raw
    }

    pub fn aux_raw(&self) -> &[u8] {
        &self.aux_raw
    }

    /// Number of positioning packets carried
    pub fn position_packets(&self) -> usize {
        self.position_raw.len() / PACKET_SIZE
    }

    /// Number of auxiliary packets carried
    pub fn aux_packets(&self) -> usize {
        self.aux_raw.len() / PACKET_SIZE
    }

    /// Whether every column holds exactly one entry per accepted packet.
    pub fn is_lockstep(&self) -> bool {
        let rows = self.timestamps.len();
        self.samples.len() == rows * VALUES_PER_PACKET
            && self.metadata.named().iter().all(|(_, column)| column.len() == rows)
    }
}
