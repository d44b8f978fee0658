//! Compressed raw sidecar streams
//!
//! Position and aux packets are not decoded. Their raw bytes are concatenated
//! in arrival order and written as a single gzip member next to the container.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::paths::{partial_path, with_suffix};
use crate::{ConvertError, Result};

/// Gzip-compress `bytes` into `<path>.gz` and return the written path.
///
/// The stream is staged in `<path>.gz.partial` and renamed when complete. An
/// empty buffer still produces a valid gzip file.
pub fn write_sidecar(bytes: &[u8], path: &Path) -> Result<PathBuf> {
    let final_path = with_suffix(path, "gz");
    let staging = partial_path(&final_path);
    let sidecar_error = |source| ConvertError::SidecarWrite { path: final_path.clone(), source };

    let written = File::create(&staging).and_then(|file| {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?.flush()
    });
    if let Err(e) = written.and_then(|()| std::fs::rename(&staging, &final_path)) {
        let _ = std::fs::remove_file(&staging);
        return Err(sidecar_error(e));
    }

    debug!("Wrote {} raw bytes to {}", bytes.len(), final_path.display());
    Ok(final_path)
}

/// Decompress a sidecar written by [`write_sidecar`].
pub fn read_sidecar(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file).read_to_end(&mut bytes).map_err(|e| ConvertError::io(path, e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_raw_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload: Vec<u8> = (0..1536u32).map(|i| (i % 251) as u8).collect();

        let written = write_sidecar(&payload, &dir.path().join("N1_2024_01_01T00_00_00.ubx"))
            .expect("write");
        assert_eq!(written, dir.path().join("N1_2024_01_01T00_00_00.ubx.gz"));
        assert_eq!(read_sidecar(&written).expect("read"), payload);
        assert!(!partial_path(&written).exists());
    }

    #[test]
    fn empty_buffer_is_a_valid_gzip_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let written = write_sidecar(&[], &dir.path().join("x.aux")).expect("write");

        let raw = std::fs::read(&written).expect("raw");
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert!(read_sidecar(&written).expect("read").is_empty());
    }

    #[test]
    fn unwritable_location_is_a_sidecar_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err =
            write_sidecar(b"abc", &dir.path().join("missing").join("x.ubx")).expect_err("no dir");
        assert!(matches!(err, ConvertError::SidecarWrite { .. }));
        assert!(err.is_recoverable());
    }
}
