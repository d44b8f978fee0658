//! Converter configuration
//!
//! Loaded from YAML. Every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! naming:
//!   container_extension: gp5
//!   position_extension: ubx
//!   aux_extension: aux
//! container:
//!   chunk_rows: 10000
//!   deflate_level: 6
//!   write_counter_channel: false
//! identity_registry: /etc/gp5conv/nodes.yaml
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::ContainerOptions;
use crate::{ConvertError, Result};

/// File extensions of the three outputs, without leading dots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNaming {
    pub container_extension: String,
    pub position_extension: String,
    pub aux_extension: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            container_extension: "gp5".to_string(),
            position_extension: "ubx".to_string(),
            aux_extension: "aux".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub naming: OutputNaming,
    pub container: ContainerOptions,
    /// Node registry used to name outputs, see [`NodeRegistry`](crate::identity::NodeRegistry)
    pub identity_registry: Option<PathBuf>,
}

impl ConvertConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ConvertConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ConvertError::config("configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container.chunk_rows == 0 {
            return Err(ConvertError::config("container.chunk_rows", "must be at least 1"));
        }
        if self.container.deflate_level > 9 {
            return Err(ConvertError::config(
                "container.deflate_level",
                format!("{} is outside 0-9", self.container.deflate_level),
            ));
        }

        let extensions = [
            ("naming.container_extension", &self.naming.container_extension),
            ("naming.position_extension", &self.naming.position_extension),
            ("naming.aux_extension", &self.naming.aux_extension),
        ];
        for (field, extension) in extensions {
            if extension.is_empty() || extension.contains(['.', '/', '\\']) {
                return Err(ConvertError::config(
                    field,
                    format!("'{}' must be a bare extension", extension),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ConvertConfig::from_yaml_str("{}").expect("config");
        assert_eq!(config, ConvertConfig::default());
        assert_eq!(config.naming.container_extension, "gp5");
        assert_eq!(config.container.chunk_rows, 10_000);
        assert_eq!(config.container.deflate_level, 6);
        assert!(!config.container.write_counter_channel);
        assert!(config.identity_registry.is_none());
    }

    #[test]
    fn partial_documents_keep_remaining_defaults() {
        let yaml = "container:\n  write_counter_channel: true\nnaming:\n  aux_extension: sen\n";
        let config = ConvertConfig::from_yaml_str(yaml).expect("config");
        assert!(config.container.write_counter_channel);
        assert_eq!(config.container.chunk_rows, 10_000);
        assert_eq!(config.naming.aux_extension, "sen");
        assert_eq!(config.naming.position_extension, "ubx");
    }

    #[test]
    fn invalid_values_are_rejected() {
        for yaml in [
            "container: {chunk_rows: 0}",
            "container: {deflate_level: 10}",
            "naming: {container_extension: ''}",
            "naming: {position_extension: ubx.gz}",
            "container: {chunk_rows: lots}",
        ] {
            let err = ConvertConfig::from_yaml_str(yaml).expect_err(yaml);
            assert!(matches!(err, ConvertError::Config { .. }), "{yaml}: {err}");
        }
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gp5conv.yaml");
        std::fs::write(&path, "identity_registry: nodes.yaml\n").expect("write");

        let config = ConvertConfig::load(&path).expect("load");
        assert_eq!(config.identity_registry, Some(PathBuf::from("nodes.yaml")));
    }
}
