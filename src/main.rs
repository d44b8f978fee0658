//! gp5conv command line
//!
//! ```bash
//! gp5conv dump.raw out/ --registry nodes.yaml --counter
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gp5conv::{ConvertConfig, ConvertError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gp5conv", version)]
#[command(
    about = "Convert a raw geophone recorder dump into an HDF5 container and gzip sidecars",
    long_about = None
)]
struct Cli {
    /// Raw dump of 512-byte recorder packets
    input: PathBuf,

    /// Directory receiving the container and sidecars
    output_dir: PathBuf,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node registry used to name outputs (overrides the configuration)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Also write the running counter as dataset ctr_a
    #[arg(long)]
    counter: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, env = "GP5CONV_LOG", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => ConvertConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ConvertConfig::default(),
    };
    if let Some(registry) = &cli.registry {
        config.identity_registry = Some(registry.clone());
    }
    if cli.counter {
        config.container.write_counter_channel = true;
    }
    config.validate()?;

    run(&cli, config).inspect_err(|e| {
        if let Some(error) = e.downcast_ref::<ConvertError>() {
            for suggestion in error.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
        }
    })
}

#[cfg(feature = "storage_hdf5")]
fn run(cli: &Cli, config: ConvertConfig) -> Result<()> {
    use gp5conv::container::format_timestamp;
    use gp5conv::{Converter, Hdf5Format};
    use std::io::Write;

    let converter = Converter::new(Hdf5Format, config);
    let summary = converter
        .convert_with_progress(&cli.input, &cli.output_dir, |progress| {
            eprint!(
                "\r{:>5.1}%  {} packets  {}",
                progress.percent,
                progress.accepted_packets,
                format_timestamp(progress.latest_timestamp_ns)
            );
            let _ = std::io::stderr().flush();
        })
        .with_context(|| format!("converting {}", cli.input.display()))?;
    eprintln!();

    let report = &summary.report;
    println!("{}", summary.identifier);
    println!("  device      {} (node {})", summary.identity.eui, summary.node_name);
    println!(
        "  calibration {} sps, gains {:?}, format v{}",
        summary.identity.sample_rate, summary.identity.gains, summary.identity.format_version
    );
    println!(
        "  span        {} .. {}",
        format_timestamp(summary.first_timestamp_ns),
        format_timestamp(summary.last_timestamp_ns)
    );
    println!(
        "  blocks      {} read: {} data ({} accepted), {} position, {} aux, {} unrecognized",
        report.blocks_read,
        report.data_packets,
        report.accepted_packets(),
        report.position_packets,
        report.aux_packets,
        report.unrecognized_packets
    );
    if report.trailing_bytes > 0 {
        println!("  trailing    {} bytes ignored", report.trailing_bytes);
    }
    println!("  samples     {}", summary.sample_count);
    println!("  container   {}", summary.container.display());
    let sidecars = [("position", &summary.position_sidecar), ("aux", &summary.aux_sidecar)];
    for (label, result) in sidecars {
        match result {
            Ok(path) => println!("  {:<11} {}", label, path.display()),
            Err(e) => println!("  {:<11} FAILED: {}", label, e),
        }
    }
    for failure in &report.decode_failures {
        println!("  skipped     block {}: {}", failure.block_index, failure.error);
    }
    for anomaly in &report.timing_anomalies {
        println!("  drift       {}", anomaly);
    }
    Ok(())
}

#[cfg(not(feature = "storage_hdf5"))]
fn run(_cli: &Cli, _config: ConvertConfig) -> Result<()> {
    Err(ConvertError::feature_not_enabled("storage_hdf5").into())
}
