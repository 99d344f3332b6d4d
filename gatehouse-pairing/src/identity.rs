//! Local node identity presented during pairing.

use std::path::Path;

use gatehouse_core::{paths, store, token};
use serde::{Deserialize, Serialize};

use crate::error::PairingError;

/// Persisted part of the identity (`~/.gatehouse/node.yaml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_id: String,
    pub display_name: String,
    pub platform: String,
    pub version: String,
}

impl NodeIdentity {
    pub fn from_record(record: NodeRecord) -> Self {
        Self {
            node_id: record.node_id,
            display_name: record.display_name,
            platform: platform_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Load the node record, creating one with a fresh id on first use.
    /// A non-empty `display_name` replaces the stored name.
    pub fn load_or_create_at(home: &Path, display_name: Option<&str>) -> Result<Self, PairingError> {
        let path = paths::node_identity_path(home);
        let existing: Option<NodeRecord> = store::load_yaml_at(&path)?;
        let requested = display_name.map(str::trim).filter(|n| !n.is_empty());

        let record = match existing {
            Some(mut record) => {
                if let Some(name) = requested.filter(|n| *n != record.display_name) {
                    record.display_name = name.to_string();
                    store::write_yaml_at(home, &path, &record)?;
                }
                record
            }
            None => {
                let record = NodeRecord {
                    node_id: format!("node-{}", &token::random_token()[..16]),
                    display_name: requested.unwrap_or("gatehouse node").to_string(),
                };
                store::write_yaml_at(home, &path, &record)?;
                tracing::info!(node_id = %record.node_id, "created node identity");
                record
            }
        };
        Ok(Self::from_record(record))
    }
}

fn platform_string() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn identity_is_stable_across_loads() {
        let home = TempDir::new().expect("tempdir");
        let first = NodeIdentity::load_or_create_at(home.path(), Some("Kitchen iPad")).expect("create");
        let second = NodeIdentity::load_or_create_at(home.path(), None).expect("load");

        assert!(first.node_id.starts_with("node-"));
        assert_eq!(first.node_id, second.node_id);
        assert_eq!(second.display_name, "Kitchen iPad");
    }

    #[test]
    fn rename_keeps_node_id() {
        let home = TempDir::new().expect("tempdir");
        let first = NodeIdentity::load_or_create_at(home.path(), None).expect("create");
        let renamed = NodeIdentity::load_or_create_at(home.path(), Some("Desk")).expect("rename");
        assert_eq!(first.node_id, renamed.node_id);
        assert_eq!(renamed.display_name, "Desk");
    }
}
