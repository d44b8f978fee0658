//! Node identity lookup
//!
//! Field deployments give each recorder a node name. When a registry is
//! configured, the node name replaces the EUI in output file names; the
//! container group is always named by the EUI.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::paths::is_plain_name;
use crate::{ConvertError, Result};

/// Resolves a device EUI to a deployment node name.
pub trait IdentityLookup {
    /// `Ok(None)` when the EUI is not known to the lookup.
    fn node_name(&self, eui: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub eui: String,
    pub nodename: String,
}

/// Node registry loaded from YAML:
///
/// ```yaml
/// nodes:
///   - eui: "0A1B2C"
///     nodename: "N042"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistry {
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

impl NodeRegistry {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let registry: NodeRegistry = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ConvertError::config("node registry", e.to_string()))?;

        for entry in &registry.nodes {
            if entry.eui.trim().is_empty() || entry.nodename.trim().is_empty() {
                return Err(ConvertError::config(
                    "node registry",
                    format!("entry {:?} has an empty eui or nodename", entry),
                ));
            }
            if !is_plain_name(&entry.nodename) {
                return Err(ConvertError::config(
                    "node registry",
                    format!("nodename '{}' is not a plain file name", entry.nodename),
                ));
            }
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        let registry = Self::from_yaml_str(&yaml)?;
        debug!("Loaded {} registry entries from {}", registry.nodes.len(), path.display());
        Ok(registry)
    }
}

impl IdentityLookup for NodeRegistry {
    fn node_name(&self, eui: &str) -> Result<Option<String>> {
        let mut matches = self.nodes.iter().filter(|n| n.eui.trim().eq_ignore_ascii_case(eui));
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        if matches.any(|other| other.nodename != first.nodename) {
            return Err(ConvertError::IdentityLookup {
                eui: eui.to_string(),
                details: "registry maps this EUI to more than one node".to_string(),
            });
        }
        Ok(Some(first.nodename.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
nodes:
  - eui: "0a1b2c"
    nodename: "N042"
  - eui: "FFEE01"
    nodename: "N007"
"#;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = NodeRegistry::from_yaml_str(REGISTRY).expect("registry");
        assert_eq!(registry.node_name("0A1B2C").expect("lookup"), Some("N042".to_string()));
        assert_eq!(registry.node_name("ffee01").expect("lookup"), Some("N007".to_string()));
        assert_eq!(registry.node_name("000000").expect("lookup"), None);
    }

    #[test]
    fn conflicting_entries_fail_the_lookup() {
        let yaml = "nodes:\n  - {eui: AA0001, nodename: N1}\n  - {eui: aa0001, nodename: N2}\n";
        let registry = NodeRegistry::from_yaml_str(yaml).expect("registry");
        let err = registry.node_name("AA0001").expect_err("conflict");
        assert!(err.is_recoverable());
    }

    #[test]
    fn malformed_registries_are_config_errors() {
        assert!(matches!(
            NodeRegistry::from_yaml_str("nodes: 12"),
            Err(ConvertError::Config { .. })
        ));
        assert!(NodeRegistry::from_yaml_str("nodes:\n  - {eui: '', nodename: N1}\n").is_err());
        assert_eq!(NodeRegistry::from_yaml_str("{}").expect("empty").nodes.len(), 0);
    }

    #[test]
    fn node_names_must_stay_inside_the_output_directory() {
        for name in ["../escaped", "a/b", "'..'", "'a\\b'"] {
            let yaml = format!("nodes:\n  - {{eui: '000001', nodename: {}}}\n", name);
            let err = NodeRegistry::from_yaml_str(&yaml).expect_err(name);
            assert!(matches!(err, ConvertError::Config { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn load_reports_missing_files_with_path() {
        let err = NodeRegistry::load(Path::new("/nonexistent/registry.yaml")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/registry.yaml"));
    }
}
