//! Converts raw geophone recorder dumps into HDF5 containers.
//!
//! A recorder dump is a flat file of 512-byte packets: data packets carrying
//! 30 four-field samples (three channels and a running counter) with their
//! GPS timing metadata, and opaque positioning and auxiliary packets. One
//! conversion produces
//!
//! - `<node>_<time>.gp5`: an HDF5 container with a group named by the device
//!   EUI, calibration attributes, a chunked and compressed `(samples, 3)`
//!   dataset and per-packet metadata,
//! - `<node>_<time>.ubx.gz` and `<node>_<time>.aux.gz`: the positioning and
//!   auxiliary packets, verbatim and gzip-compressed.
//!
//! # Features
//!
//! - **Tolerant ingest**: undecodable packets are skipped and reported, the
//!   rest of the dump is still converted
//! - **Drift detection**: gaps between consecutive packets are checked
//!   against the sample rate
//! - **Atomic outputs**: files appear under their final names only when
//!   complete
//! - **Pluggable storage**: the HDF5 engine (feature `storage_hdf5`) and an
//!   in-memory engine share one serializer
//!
//! # Example
//!
//! ```rust,no_run
//! use gp5conv::container::memory::MemoryFormat;
//! use gp5conv::{ConvertConfig, Converter};
//! use std::path::Path;
//!
//! fn main() -> gp5conv::Result<()> {
//!     let converter = Converter::new(MemoryFormat, ConvertConfig::default());
//!     let summary = converter.convert(Path::new("dump.raw"), Path::new("out"))?;
//!     println!("{}: {} samples", summary.identifier, summary.sample_count);
//!     Ok(())
//! }
//! ```

mod error;
pub mod paths;

// Input side
pub mod demux;
pub mod packet;
pub mod reader;
pub mod session;

// Output side
pub mod container;
pub mod sidecar;

pub mod config;
pub mod convert;
pub mod identity;

pub use error::*;

pub use config::{ConvertConfig, OutputNaming};
pub use container::{ContainerFormat, ContainerOptions, ContainerSink};
pub use convert::{ConversionSummary, Converter};
pub use demux::{Demultiplexer, Ingest, IngestReport, Progress};
pub use identity::{IdentityLookup, NodeRegistry};
pub use reader::PacketReader;
pub use session::{DeviceIdentity, SessionState, TimingAnomaly};

#[cfg(feature = "storage_hdf5")]
pub use container::hdf5::Hdf5Format;
