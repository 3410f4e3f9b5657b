use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::core::MembershipDirectory;
use crate::error::DirectoryError;
use crate::membership::types::Node;
use crate::registry::cache::CacheBackedRegistry;
use crate::store::sqlite::{DirectoryDb, NodeStore};

/// Owns the membership registry. All mutation of the node map goes
/// through this component; the underlying cache and table are never
/// exposed to callers.
pub struct MembershipManager {
    registry: CacheBackedRegistry<Node>,
}

impl MembershipManager {
    pub fn new(db: Arc<DirectoryDb>) -> Self {
        let store = Arc::new(NodeStore::new(db));
        Self {
            registry: CacheBackedRegistry::new("membership", store),
        }
    }
}

impl MembershipDirectory for MembershipManager {
    fn network_nodes(&self) -> HashMap<String, Node> {
        self.registry
            .identifiers()
            .into_iter()
            .filter_map(|name| self.registry.get(&name).map(|node| (name, node)))
            .collect()
    }

    fn network_node(&self, node_name: &str) -> Option<Node> {
        self.registry.get(node_name)
    }

    fn add_network_node(&self, node_name: &str, node: &Node) -> Result<(), DirectoryError> {
        if node_name.is_empty() {
            return Err(DirectoryError::Validation("node name is empty".into()));
        }
        if node_name != node.name {
            return Err(DirectoryError::Validation(format!(
                "registration key '{node_name}' does not match node name '{}'",
                node.name
            )));
        }

        self.registry.insert(node_name, node.clone())?;
        tracing::info!(
            node = node_name,
            gossip_addr = %node.gossip_addr,
            https_addr = %node.https_addr,
            "registered network node"
        );
        Ok(())
    }

    fn network_node_exists(&self, node_name: &str) -> bool {
        self.registry.exists(node_name)
    }

    fn remove_network_node(&self, node_name: &str) -> Result<(), DirectoryError> {
        if node_name.is_empty() {
            return Err(DirectoryError::Validation("node name is empty".into()));
        }
        self.registry.remove(node_name)?;
        tracing::info!(node = node_name, "evicted network node");
        Ok(())
    }
}
