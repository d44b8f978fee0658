//! Stream demultiplexing
//!
//! Drives the read loop: every block is classified, data packets are decoded
//! and accumulated, positioning and auxiliary packets are appended verbatim,
//! unrecognized blocks are dropped. Decode failures and timing anomalies are
//! collected into an [`IngestReport`] and never stop the loop.

use tracing::{debug, info, trace, warn};

use crate::packet::{PacketClass, PacketDecoder, RecorderDecoder, classify};
use crate::reader::PacketReader;
use crate::session::{SessionState, TimingAnomaly};
use crate::{ConvertError, Result};

/// A data packet that failed to decode and was skipped.
#[derive(Debug)]
pub struct DecodeFailure {
    /// Index of the block within the dump
    pub block_index: usize,
    pub error: ConvertError,
}

/// Ingestion progress, emitted roughly every tenth of the dump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub accepted_packets: usize,
    /// Blocks in the dump; an overestimate of the data packet count
    pub estimated_total: usize,
    pub percent: f64,
    /// First-sample time of the latest accepted packet
    pub latest_timestamp_ns: i64,
}

/// Statistics and advisories collected while reading a dump.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub blocks_read: usize,
    pub data_packets: usize,
    pub position_packets: usize,
    pub aux_packets: usize,
    pub unrecognized_packets: usize,
    pub trailing_bytes: usize,
    pub decode_failures: Vec<DecodeFailure>,
    pub timing_anomalies: Vec<TimingAnomaly>,
}

impl IngestReport {
    /// Data packets that decoded and were accumulated
    pub fn accepted_packets(&self) -> usize {
        self.data_packets - self.decode_failures.len()
    }
}

/// Result of a completed ingestion.
#[derive(Debug)]
pub struct Ingest {
    pub session: SessionState,
    pub report: IngestReport,
}

type ProgressCallback<'a> = Box<dyn FnMut(&Progress) + 'a>;

/// Routes classified packets into a [`SessionState`].
pub struct Demultiplexer<'a, D: PacketDecoder = RecorderDecoder> {
    decoder: D,
    on_progress: Option<ProgressCallback<'a>>,
}

impl Default for Demultiplexer<'_, RecorderDecoder> {
    fn default() -> Self {
        Self::new(RecorderDecoder)
    }
}

impl<'a, D: PacketDecoder> Demultiplexer<'a, D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder, on_progress: None }
    }

    /// Install a progress callback.
    pub fn on_progress(mut self, callback: impl FnMut(&Progress) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Read the whole dump and accumulate it.
    pub fn run(&mut self, reader: &mut PacketReader) -> Result<Ingest> {
        let estimated_total = reader.total_blocks();
        let progress_step = (estimated_total / 10).max(1);

        let mut session = SessionState::with_capacity(estimated_total);
        let mut report =
            IngestReport { trailing_bytes: reader.trailing_bytes(), ..Default::default() };

        while let Some(block) = reader.read_next_block() {
            let block_index = report.blocks_read;
            report.blocks_read += 1;

            let class = classify(block);
            trace!("Block {}: {:?}", block_index, class);

            match class {
                PacketClass::Data => {
                    report.data_packets += 1;
                    let record = match self.decoder.decode(block) {
                        Ok(record) => record,
                        Err(error) => {
                            warn!("Skipping data packet at block {}: {}", block_index, error);
                            report.decode_failures.push(DecodeFailure { block_index, error });
                            continue;
                        }
                    };

                    if let Some(anomaly) = session.accept(&record) {
                        report.timing_anomalies.push(anomaly);
                    }

                    let accepted = session.accepted_packets();
                    if accepted % progress_step == 0 {
                        if let Some(callback) = self.on_progress.as_mut() {
                            callback(&Progress {
                                accepted_packets: accepted,
                                estimated_total,
                                percent: accepted as f64 / estimated_total as f64 * 100.0,
                                latest_timestamp_ns: record.first_sample_ns,
                            });
                        }
                    }
                }
                PacketClass::Position => {
                    report.position_packets += 1;
                    session.push_position(block);
                }
                PacketClass::Aux => {
                    report.aux_packets += 1;
                    session.push_aux(block);
                }
                PacketClass::Unrecognized => {
                    report.unrecognized_packets += 1;
                }
            }
        }

        if report.trailing_bytes > 0 {
            debug!("Discarded trailing partial block of {} bytes", report.trailing_bytes);
        }

        info!(
            "Read {} blocks from {}: {} data ({} accepted, {} skipped), {} position, {} aux, {} unrecognized, {} timing anomalies",
            report.blocks_read,
            reader.file_path().display(),
            report.data_packets,
            session.accepted_packets(),
            report.decode_failures.len(),
            report.position_packets,
            report.aux_packets,
            report.unrecognized_packets,
            report.timing_anomalies.len()
        );

        Ok(Ingest { session, report })
    }
}
