//! Container serialization
//!
//! Turns a finished [`SessionState`] into a hierarchical container: one group
//! named by the device EUI, scalar calibration attributes, a chunked and
//! compressed `(samples, 3)` sample dataset filled one channel column at a
//! time from the interleaved buffer, and flat per-packet metadata datasets.
//!
//! The storage engine sits behind [`ContainerFormat`] / [`ContainerSink`].
//! [`memory::MemoryFormat`] keeps everything in memory;
//! `hdf5::Hdf5Format` (feature `storage_hdf5`) writes HDF5 files.
//!
//! ## Layout
//!
//! ```text
//! /<EUI>                       group
//!   @eui    text               attributes
//!   @sps    f64
//!   @gainA  f64
//!   @gainB  f64
//!   @gainC  f64
//!   data_a  i32 (N, 3)         chunked (min(10000, N), 1), deflate
//!   ctr_a   i32 (N, 1)         optional, chunked, deflate
//!   ymd hms gpsfix cpps c0 cN  u32 (packets,)
//!   pktT0   i64 (packets,)     first-sample time, ns since epoch
//! ```

pub mod deinterleave;
#[cfg(feature = "storage_hdf5")]
pub mod hdf5;
pub mod memory;

use std::path::Path;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use deinterleave::StridedSelection;

use crate::packet::format::{COUNTER_CHANNEL, DATA_CHANNELS};
use crate::session::{DeviceIdentity, SessionState};
use crate::{ConvertError, Result};

pub const DATA_DATASET: &str = "data_a";
pub const COUNTER_DATASET: &str = "ctr_a";
pub const TIMESTAMP_DATASET: &str = "pktT0";

/// Pattern used for the time component of output identifiers.
pub const IDENTIFIER_TIME_FORMAT: &str = "%Y_%m_%dT%H_%M_%S";

/// Scalar attribute values written on the device group.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Float64(f64),
}

/// Container layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Rows per chunk of the sample dataset, clamped to the row count
    pub chunk_rows: usize,
    /// Deflate level 0-9 for chunked datasets
    pub deflate_level: u8,
    /// Also persist the running counter as `ctr_a`
    pub write_counter_channel: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self { chunk_rows: 10_000, deflate_level: 6, write_counter_channel: false }
    }
}

/// Shape and storage of a chunked, compressed sample dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDatasetSpec<'a> {
    pub name: &'a str,
    pub rows: usize,
    pub columns: usize,
    pub chunk: (usize, usize),
    pub deflate_level: u8,
}

/// One open container, scoped to the device group.
///
/// Dropping a sink without calling [`finish`](ContainerSink::finish) must
/// release every handle and leave nothing under the final name.
pub trait ContainerSink {
    type Output;

    fn write_attribute(&mut self, name: &str, value: &AttributeValue) -> Result<()>;

    fn create_sample_dataset(&mut self, spec: &SampleDatasetSpec<'_>) -> Result<()>;

    /// Write `selection` of the interleaved `source` into column `column` of
    /// a sample dataset. The selection count must equal the dataset rows.
    fn write_sample_column(
        &mut self,
        dataset: &str,
        column: usize,
        source: &[i32],
        selection: StridedSelection,
    ) -> Result<()>;

    fn write_u32_series(&mut self, name: &str, values: &[u32]) -> Result<()>;

    fn write_i64_series(&mut self, name: &str, values: &[i64]) -> Result<()>;

    /// Close every handle and publish the container.
    fn finish(self) -> Result<Self::Output>;
}

/// A container storage engine.
pub trait ContainerFormat {
    type Sink: ContainerSink;

    /// Create a container at `path` rooted at a group named `group`.
    fn create(&self, path: &Path, group: &str) -> Result<Self::Sink>;
}

/// Render a nanosecond epoch timestamp as `YYYY_MM_DDTHH_MM_SS` (UTC).
pub fn format_timestamp(ns: i64) -> String {
    DateTime::from_timestamp_nanos(ns).format(IDENTIFIER_TIME_FORMAT).to_string()
}

/// Output identifier: `<node>_<first timestamp>`.
pub fn identifier(node_name: &str, first_timestamp_ns: i64) -> String {
    format!("{}_{}", node_name, format_timestamp(first_timestamp_ns))
}

/// Group attributes for a device identity, in write order.
pub fn identity_attributes(identity: &DeviceIdentity) -> [(&'static str, AttributeValue); 5] {
    [
        ("eui", AttributeValue::Text(identity.eui.clone())),
        ("sps", AttributeValue::Float64(f64::from(identity.sample_rate))),
        ("gainA", AttributeValue::Float64(identity.gains[0])),
        ("gainB", AttributeValue::Float64(identity.gains[1])),
        ("gainC", AttributeValue::Float64(identity.gains[2])),
    ]
}

/// Serialize a finished session into a new container at `path`.
pub fn serialize<F: ContainerFormat>(
    format: &F,
    session: &SessionState,
    path: &Path,
    options: &ContainerOptions,
) -> Result<<F::Sink as ContainerSink>::Output> {
    let identity = session
        .identity()
        .ok_or_else(|| ConvertError::EmptySession { path: path.to_path_buf() })?;

    let mut sink = format.create(path, &identity.eui)?;

    for (name, value) in identity_attributes(identity) {
        sink.write_attribute(name, &value)?;
    }

    let rows = session.sample_count();
    let chunk_rows = options.chunk_rows.min(rows).max(1);
    if chunk_rows != options.chunk_rows {
        debug!("Clamped chunk rows from {} to {}", options.chunk_rows, chunk_rows);
    }

    sink.create_sample_dataset(&SampleDatasetSpec {
        name: DATA_DATASET,
        rows,
        columns: DATA_CHANNELS,
        chunk: (chunk_rows, 1),
        deflate_level: options.deflate_level,
    })?;
    for channel in 0..DATA_CHANNELS {
        sink.write_sample_column(
            DATA_DATASET,
            channel,
            session.samples(),
            StridedSelection::channel(channel, rows),
        )?;
    }

    if options.write_counter_channel {
        sink.create_sample_dataset(&SampleDatasetSpec {
            name: COUNTER_DATASET,
            rows,
            columns: 1,
            chunk: (chunk_rows, 1),
            deflate_level: options.deflate_level,
        })?;
        sink.write_sample_column(
            COUNTER_DATASET,
            0,
            session.samples(),
            StridedSelection::channel(COUNTER_CHANNEL, rows),
        )?;
    }

    for (name, column) in session.metadata().named() {
        sink.write_u32_series(name, column)?;
    }
    sink.write_i64_series(TIMESTAMP_DATASET, session.timestamps())?;

    let output = sink.finish()?;
    info!(
        "Wrote container {}: group {}, {} samples x {} channels, {} packets",
        path.display(),
        identity.eui,
        rows,
        DATA_CHANNELS,
        session.accepted_packets()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::memory::{DatasetValues, MemoryFormat};
    use super::*;
    use crate::packet::encode::DataPacketBuilder;
    use crate::packet::{PacketDecoder, RecorderDecoder};
    use std::path::PathBuf;

    /// Session of `packets` packets whose sample values encode their position:
    /// packet p, sample s, field f holds `p * 1000 + s * 10 + f`.
    fn session_with(packets: u32) -> SessionState {
        let mut session = SessionState::new();
        for p in 0..packets {
            let mut values = [0i32; 120];
            for (i, v) in values.iter_mut().enumerate() {
                *v = (p * 1000) as i32 + (i / 4 * 10 + i % 4) as i32;
            }
            let packet = DataPacketBuilder::new()
                .eui([0x0A, 0x1B, 0x2C])
                .gain_codes(0, 1, 7)
                .clock(0, p * 300_000, 1_000_000)
                .samples(values)
                .build();
            session.accept(&RecorderDecoder.decode(&packet).expect("fixture decodes"));
        }
        session
    }

    #[test]
    fn identifier_uses_utc_first_timestamp() {
        // 2024-01-31T23:59:59.25Z
        let ns = 1_706_745_599_250_000_000;
        assert_eq!(format_timestamp(ns), "2024_01_31T23_59_59");
        assert_eq!(identifier("0A1B2C", ns), "0A1B2C_2024_01_31T23_59_59");
        assert_eq!(format_timestamp(0), "1970_01_01T00_00_00");
    }

    #[test]
    fn serializes_full_layout() {
        let session = session_with(4);
        let container = serialize(
            &MemoryFormat,
            &session,
            &PathBuf::from("out.gp5"),
            &ContainerOptions::default(),
        )
        .expect("serialize");

        assert_eq!(container.group, "0A1B2C");
        assert_eq!(container.attributes["eui"], AttributeValue::Text("0A1B2C".into()));
        assert_eq!(container.attributes["sps"], AttributeValue::Float64(100.0));
        assert_eq!(container.attributes["gainA"], AttributeValue::Float64(1.0));
        assert_eq!(container.attributes["gainB"], AttributeValue::Float64(2.0));
        assert_eq!(container.attributes["gainC"], AttributeValue::Float64(128.0));

        let data = &container.datasets[DATA_DATASET];
        assert_eq!(data.shape, vec![120, 3]);
        assert_eq!(data.chunk, Some((120, 1)));
        assert_eq!(data.deflate_level, Some(6));

        for name in ["ymd", "hms", "gpsfix", "cpps", "c0", "cN", TIMESTAMP_DATASET] {
            let dataset = &container.datasets[name];
            assert_eq!(dataset.shape, vec![4], "{name}");
            assert_eq!(dataset.chunk, None, "{name}");
        }
        assert!(!container.datasets.contains_key(COUNTER_DATASET));
        assert_eq!(
            container.datasets[TIMESTAMP_DATASET].values,
            DatasetValues::I64(session.timestamps().to_vec())
        );
    }

    #[test]
    fn columns_are_deinterleaved_per_channel() {
        let session = session_with(3);
        let container = serialize(
            &MemoryFormat,
            &session,
            &PathBuf::from("out.gp5"),
            &ContainerOptions::default(),
        )
        .expect("serialize");

        let data = &container.datasets[DATA_DATASET];
        for channel in 0..3 {
            let column = data.column_i32(channel).expect("i32 column");
            let expected: Vec<i32> =
                (0..90).map(|k| session.samples()[4 * k + channel]).collect();
            assert_eq!(column, expected);
            // packet 2, sample 5
            assert_eq!(column[65], 2000 + 50 + channel as i32);
        }
    }

    #[test]
    fn counter_channel_is_optional() {
        let session = session_with(2);
        let options =
            ContainerOptions { write_counter_channel: true, chunk_rows: 16, ..Default::default() };
        let container = serialize(&MemoryFormat, &session, &PathBuf::from("out.gp5"), &options)
            .expect("serialize");

        let data = &container.datasets[DATA_DATASET];
        assert_eq!(data.chunk, Some((16, 1)));

        let counter = &container.datasets[COUNTER_DATASET];
        assert_eq!(counter.shape, vec![60, 1]);
        let column = counter.column_i32(0).expect("i32 column");
        assert_eq!(column[0], 3);
        assert_eq!(column[59], 1000 + 290 + 3);
    }

    #[test]
    fn empty_session_cannot_be_serialized() {
        let err = serialize(
            &MemoryFormat,
            &SessionState::new(),
            &PathBuf::from("out.gp5"),
            &ContainerOptions::default(),
        )
        .expect_err("empty session");
        assert!(matches!(err, ConvertError::EmptySession { .. }));
    }
}
