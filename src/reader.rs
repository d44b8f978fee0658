//! Raw dump reader
//!
//! Loads a raw recorder dump and hands it out as fixed-size blocks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use gp5conv::PacketReader;
//!
//! fn count_blocks() -> gp5conv::Result<()> {
//!     let mut reader = PacketReader::open("recording.raw")?;
//!     println!("Dump holds {} packets", reader.total_blocks());
//!
//!     while let Some(block) = reader.read_next_block() {
//!         println!("kind byte {:#04x}", block[2]);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Performance Notes
//!
//! - The whole file is loaded at construction; conversion needs every packet
//!   before any output can be shaped
//! - Block reads are zero-copy borrows into the loaded buffer

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::packet::{PACKET_SIZE, RawPacket};
use crate::{ConvertError, Result};

/// Sequential fixed-size block reader over a raw dump.
pub struct PacketReader {
    data: Vec<u8>,
    path: PathBuf,
    current_block: usize,
    total_blocks: usize,
}

impl PacketReader {
    /// Open and load a raw dump. Fails if the file cannot be opened or read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| ConvertError::io(path, e))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| ConvertError::io(path, e))?;

        info!("Opened {}: {} bytes", path.display(), data.len());
        Ok(Self::from_bytes_with_path(data, path.to_path_buf()))
    }

    /// Create a reader over in-memory bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::from_bytes_with_path(data, PathBuf::from("<memory>"))
    }

    fn from_bytes_with_path(data: Vec<u8>, path: PathBuf) -> Self {
        let total_blocks = data.len() / PACKET_SIZE;
        let trailing = data.len() % PACKET_SIZE;
        if trailing > 0 {
            debug!(
                "{} ends with a partial block of {} bytes; it will be discarded",
                path.display(),
                trailing
            );
        }

        Self { data, path, current_block: 0, total_blocks }
    }

    /// Read the next full block, or `None` at end of stream.
    pub fn read_next_block(&mut self) -> Option<&RawPacket> {
        if self.current_block >= self.total_blocks {
            return None;
        }

        let start = self.current_block * PACKET_SIZE;
        self.current_block += 1;
        self.data[start..start + PACKET_SIZE].try_into().ok()
    }

    /// Number of complete blocks in the dump
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    /// Index of the next block to be read
    pub fn current_block(&self) -> usize {
        self.current_block
    }

    /// Bytes after the last complete block
    pub fn trailing_bytes(&self) -> usize {
        self.data.len() % PACKET_SIZE
    }

    /// Get the file path this reader was opened from
    pub fn file_path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_full_blocks_and_discards_partial_tail() {
        let mut data = vec![0u8; PACKET_SIZE * 2 + 100];
        data[PACKET_SIZE] = 7;
        let mut reader = PacketReader::from_bytes(data);

        assert_eq!(reader.total_blocks(), 2);
        assert_eq!(reader.trailing_bytes(), 100);

        assert_eq!(reader.read_next_block().map(|b| b[0]), Some(0));
        assert_eq!(reader.read_next_block().map(|b| b[0]), Some(7));
        assert!(reader.read_next_block().is_none());
        assert!(reader.read_next_block().is_none());
        assert_eq!(reader.current_block(), 2);
    }

    #[test]
    fn empty_and_short_inputs_have_no_blocks() {
        let mut empty = PacketReader::from_bytes(Vec::new());
        assert!(empty.read_next_block().is_none());

        let mut short = PacketReader::from_bytes(vec![0u8; PACKET_SIZE - 1]);
        assert_eq!(short.total_blocks(), 0);
        assert!(short.read_next_block().is_none());
    }

    #[test]
    fn missing_file_fails_fast_with_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.raw");

        match PacketReader::open(&missing) {
            Err(ConvertError::Io { path, .. }) => assert_eq!(path, missing),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opening a missing file must fail"),
        }
    }
}
