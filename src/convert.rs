//! End-to-end conversion of one dump
//!
//! Open, ingest, name, then write the container and the two sidecars. Only
//! failures that leave nothing useful to write abort the run; per-packet and
//! sidecar problems are carried in the [`ConversionSummary`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::ConvertConfig;
use crate::container::{self, ContainerFormat, ContainerSink};
use crate::demux::{Demultiplexer, IngestReport, Progress};
use crate::identity::{IdentityLookup, NodeRegistry};
use crate::paths::{is_plain_name, with_suffix};
use crate::reader::PacketReader;
use crate::session::DeviceIdentity;
use crate::sidecar::write_sidecar;
use crate::{ConvertError, Result};

/// Outcome of a conversion.
#[derive(Debug)]
pub struct ConversionSummary<O> {
    /// `<node>_<YYYY_MM_DDTHH_MM_SS>`, the stem of every output file
    pub identifier: String,
    pub node_name: String,
    pub identity: DeviceIdentity,
    /// Whatever the container engine produced
    pub container: O,
    pub position_sidecar: Result<PathBuf>,
    pub aux_sidecar: Result<PathBuf>,
    pub report: IngestReport,
    pub sample_count: usize,
    pub first_timestamp_ns: i64,
    pub last_timestamp_ns: i64,
}

impl<O> ConversionSummary<O> {
    /// Sidecar errors, if any.
    pub fn sidecar_failures(&self) -> impl Iterator<Item = &ConvertError> {
        [&self.position_sidecar, &self.aux_sidecar].into_iter().filter_map(|r| r.as_ref().err())
    }
}

/// Converts dumps with a given container engine and configuration.
pub struct Converter<F: ContainerFormat> {
    format: F,
    config: ConvertConfig,
    lookup: Option<Box<dyn IdentityLookup>>,
}

impl<F: ContainerFormat> Converter<F> {
    /// Build a converter. A configured node registry is loaded here; if it
    /// cannot be loaded, outputs fall back to EUI naming.
    pub fn new(format: F, config: ConvertConfig) -> Self {
        let lookup = config.identity_registry.as_deref().and_then(|path| {
            match NodeRegistry::load(path) {
                Ok(registry) => Some(Box::new(registry) as Box<dyn IdentityLookup>),
                Err(e) => {
                    warn!("Node registry unavailable, naming outputs by EUI: {}", e);
                    None
                }
            }
        });
        Self { format, config, lookup }
    }

    /// Replace the identity lookup.
    pub fn with_lookup(mut self, lookup: impl IdentityLookup + 'static) -> Self {
        self.lookup = Some(Box::new(lookup));
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<ConversionSummary<<F::Sink as ContainerSink>::Output>> {
        self.convert_with_progress(input, output_dir, |_| {})
    }

    pub fn convert_with_progress(
        &self,
        input: &Path,
        output_dir: &Path,
        on_progress: impl FnMut(&Progress),
    ) -> Result<ConversionSummary<<F::Sink as ContainerSink>::Output>> {
        let mut reader = PacketReader::open(input)?;
        if !output_dir.is_dir() {
            return Err(ConvertError::io(
                output_dir,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "output directory does not exist",
                ),
            ));
        }
        info!("Converting {} ({} blocks)", input.display(), reader.total_blocks());

        let ingest = Demultiplexer::default().on_progress(on_progress).run(&mut reader)?;
        let session = ingest.session;

        let (Some(identity), Some(first_timestamp_ns), Some(last_timestamp_ns)) =
            (session.identity().cloned(), session.first_timestamp(), session.last_timestamp())
        else {
            return Err(ConvertError::EmptySession { path: input.to_path_buf() });
        };

        let node_name = self.node_name(&identity.eui);
        let identifier = container::identifier(&node_name, first_timestamp_ns);
        let base = output_dir.join(&identifier);
        debug!("Output identifier {}", identifier);

        let container_path = with_suffix(&base, &self.config.naming.container_extension);
        let container = container::serialize(
            &self.format,
            &session,
            &container_path,
            &self.config.container,
        )?;

        let position_sidecar = write_sidecar(
            session.position_raw(),
            &with_suffix(&base, &self.config.naming.position_extension),
        );
        let aux_sidecar = write_sidecar(
            session.aux_raw(),
            &with_suffix(&base, &self.config.naming.aux_extension),
        );
        for result in [&position_sidecar, &aux_sidecar] {
            match result {
                Ok(path) => info!("Wrote sidecar {}", path.display()),
                Err(e) => warn!("Sidecar not written: {}", e),
            }
        }

        Ok(ConversionSummary {
            identifier,
            node_name,
            identity,
            container,
            position_sidecar,
            aux_sidecar,
            report: ingest.report,
            sample_count: session.sample_count(),
            first_timestamp_ns,
            last_timestamp_ns,
        })
    }

    fn node_name(&self, eui: &str) -> String {
        let Some(lookup) = self.lookup.as_ref() else {
            return eui.to_string();
        };
        match lookup.node_name(eui) {
            Ok(Some(name)) if is_plain_name(&name) => {
                debug!("EUI {} is node {}", eui, name);
                name
            }
            Ok(Some(name)) => {
                warn!(
                    "Node name '{}' for EUI {} is not a plain file name, naming outputs by EUI",
                    name, eui
                );
                eui.to_string()
            }
            Ok(None) => {
                warn!("EUI {} is not in the node registry, naming outputs by EUI", eui);
                eui.to_string()
            }
            Err(e) => {
                warn!("Identity lookup failed, naming outputs by EUI: {}", e);
                eui.to_string()
            }
        }
    }
}
