//! Recorder packet format support
//!
//! Classification of raw 512-byte packets, decoding of data packets, and an
//! encoder for producing synthetic packets in the same layout.

pub mod classify;
pub mod decode;
pub mod encode;
pub mod format;

pub use classify::{PacketClass, classify};
pub use decode::{DecodedDataRecord, FixMetadata, PacketDecoder, RecorderDecoder};
pub use format::{PACKET_SIZE, RawPacket};
