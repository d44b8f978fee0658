//! Error types for telemetry conversion.
//!
//! All errors implement `std::error::Error` and carry enough structured context
//! (paths, dataset names, decode details) to explain which artifact failed.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: the input dump cannot be opened or read, or an output
//!   location cannot be prepared
//! - **Decode Errors**: a data packet fails structural decoding; the packet is
//!   skipped and ingestion continues
//! - **Container Errors**: the HDF5 container, one of its datasets, or one of
//!   its writes failed; serialization is aborted
//! - **Sidecar Errors**: a compressed raw stream could not be written; the
//!   container can still succeed
//! - **Configuration Errors**: invalid settings or registry files
//!
//! Timing anomalies are not errors. They are reported as
//! [`TimingAnomaly`](crate::session::TimingAnomaly) values.
//!
//! ## Recovery
//!
//! ```rust
//! use gp5conv::ConvertError;
//!
//! let error = ConvertError::decode("Sample rate code", "code 9 is not assigned");
//! assert!(error.is_recoverable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations.
pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Cannot create container {path}: {details}")]
    ContainerCreation { path: PathBuf, details: String },

    #[error("Cannot create dataset '{dataset}': {details}")]
    DatasetCreation { dataset: String, details: String },

    #[error("Cannot write '{target}' to container: {details}")]
    ContainerWrite { target: String, details: String },

    #[error("Cannot write sidecar {path}")]
    SidecarWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No accepted data packets for {path}")]
    EmptySession { path: PathBuf },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Identity lookup failed for {eui}: {details}")]
    IdentityLookup { eui: String, details: String },

    #[error("Feature '{feature}' is not enabled. Rebuild with --features {feature}")]
    FeatureNotEnabled { feature: String },
}

impl ConvertError {
    /// Returns whether the run can continue after this error.
    ///
    /// Recoverable errors affect a single packet or a single optional
    /// artifact; everything else terminates the conversion.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ConvertError::Decode { .. } => true,
            ConvertError::SidecarWrite { .. } => true,
            ConvertError::IdentityLookup { .. } => true,
            ConvertError::Io { .. } => false,
            ConvertError::ContainerCreation { .. } => false,
            ConvertError::DatasetCreation { .. } => false,
            ConvertError::ContainerWrite { .. } => false,
            ConvertError::EmptySession { .. } => false,
            ConvertError::Config { .. } => false,
            ConvertError::FeatureNotEnabled { .. } => false,
        }
    }

    /// Returns suggested operator actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ConvertError::Io { .. } => vec![
                "Check the input file exists and is readable",
                "Check the output directory exists and is writable",
                "Ensure sufficient disk space",
            ],
            ConvertError::Decode { .. } => vec![
                "Inspect the packet with a hex dump",
                "Verify the recorder firmware format version",
            ],
            ConvertError::ContainerCreation { .. } => vec![
                "Check the output directory is writable",
                "Remove stale .partial files from earlier runs",
                "Verify the HDF5 library installation",
            ],
            ConvertError::DatasetCreation { .. } | ConvertError::ContainerWrite { .. } => vec![
                "Check chunk and compression settings",
                "Ensure sufficient disk space",
            ],
            ConvertError::SidecarWrite { .. } => vec![
                "Check the output directory is writable",
                "Ensure sufficient disk space",
            ],
            ConvertError::EmptySession { .. } => vec![
                "Verify the input is a raw recorder dump",
                "Check whether every data packet failed to decode",
            ],
            ConvertError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Compare against the documented defaults",
            ],
            ConvertError::IdentityLookup { .. } => vec![
                "Check the node registry path",
                "Add the device EUI to the registry",
            ],
            ConvertError::FeatureNotEnabled { .. } => {
                vec!["Rebuild with the named cargo feature enabled"]
            }
        }
    }

    /// Helper constructor for I/O errors with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io { path: path.into(), source }
    }

    /// Helper constructor for packet decode errors.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        ConvertError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for container creation errors.
    pub fn container_creation(path: impl Into<PathBuf>, details: impl ToString) -> Self {
        ConvertError::ContainerCreation { path: path.into(), details: details.to_string() }
    }

    /// Helper constructor for dataset creation errors.
    pub fn dataset_creation(dataset: impl Into<String>, details: impl ToString) -> Self {
        ConvertError::DatasetCreation { dataset: dataset.into(), details: details.to_string() }
    }

    /// Helper constructor for container write errors.
    pub fn container_write(target: impl Into<String>, details: impl ToString) -> Self {
        ConvertError::ContainerWrite { target: target.into(), details: details.to_string() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        ConvertError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for feature-gated functionality.
    pub fn feature_not_enabled(feature: impl Into<String>) -> Self {
        ConvertError::FeatureNotEnabled { feature: feature.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            context in "\\w+",
            details in ".*",
            dataset in "[a-zA-Z_]+",
          ) {
            let decode = ConvertError::decode(context.clone(), details.clone());
            let dataset_err = ConvertError::dataset_creation(dataset.clone(), details.clone());

            let decode_msg = decode.to_string();
            prop_assert!(decode_msg.contains(&context));
            prop_assert!(decode_msg.contains(&details));

            let dataset_msg = dataset_err.to_string();
            prop_assert!(dataset_msg.contains(&dataset));
          }

          #[test]
          fn io_errors_keep_path_and_source_message(reason in ".*") {
            let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
            match ConvertError::io("in.raw", io_err) {
              ConvertError::Io { path, source } => {
                prop_assert_eq!(path, PathBuf::from("in.raw"));
                prop_assert_eq!(source.to_string(), reason);
              }
              _ => prop_assert!(false, "Expected Io error from ConvertError::io"),
            }
          }
        }
    }

    #[test]
    fn recoverability_follows_error_taxonomy() {
        assert!(ConvertError::decode("header", "bad sync").is_recoverable());
        assert!(
            ConvertError::SidecarWrite {
                path: PathBuf::from("x.ubx.gz"),
                source: std::io::Error::other("disk full"),
            }
            .is_recoverable()
        );
        assert!(
            ConvertError::IdentityLookup { eui: "0A1B2C".into(), details: "missing".into() }
                .is_recoverable()
        );

        assert!(!ConvertError::io("in.raw", std::io::Error::other("gone")).is_recoverable());
        assert!(!ConvertError::container_creation("out.gp5", "denied").is_recoverable());
        assert!(!ConvertError::dataset_creation("data_a", "bad chunk").is_recoverable());
        assert!(!ConvertError::EmptySession { path: "in.raw".into() }.is_recoverable());
    }

    #[test]
    fn every_error_has_suggestions() {
        let errors = [
            ConvertError::io("in.raw", std::io::Error::other("gone")),
            ConvertError::decode("header", "bad sync"),
            ConvertError::container_creation("out.gp5", "denied"),
            ConvertError::container_write("data_a", "short write"),
            ConvertError::config("naming", "empty extension"),
            ConvertError::feature_not_enabled("storage_hdf5"),
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ConvertError>();

        let error = ConvertError::io("in.raw", std::io::Error::other("gone"));
        let source = std::error::Error::source(&error).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("gone"));
    }
}
