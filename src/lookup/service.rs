use std::sync::Arc;

use crate::directory::core::DatasetLookup;
use crate::error::DirectoryError;
use crate::membership::types::Node;
use crate::registry::cache::CacheBackedRegistry;
use crate::store::sqlite::{DirectoryDb, LookupStore};

/// Owns the dataset-to-node lookup table. Cached identifier reads answer
/// the hot "who serves this dataset" path; the `dataset_lookup` table is
/// the durable authority.
pub struct DatasetLookupService {
    registry: CacheBackedRegistry<String>,
    db: Arc<DirectoryDb>,
}

impl DatasetLookupService {
    pub fn new(db: Arc<DirectoryDb>) -> Self {
        let store = Arc::new(LookupStore::new(db.clone()));
        Self {
            registry: CacheBackedRegistry::new("dataset-lookup", store),
            db,
        }
    }
}

impl DatasetLookup for DatasetLookupService {
    fn dataset_node_exists(&self, dataset_id: &str) -> bool {
        if dataset_id.is_empty() {
            tracing::error!("dataset identifier must not be empty");
            return false;
        }
        self.registry.exists(dataset_id)
    }

    fn insert_dataset_lookup_entry(
        &self,
        dataset_id: &str,
        node_name: &str,
    ) -> Result<(), DirectoryError> {
        if dataset_id.is_empty() {
            return Err(DirectoryError::Validation(
                "dataset identifier is empty".into(),
            ));
        }
        if node_name.is_empty() {
            return Err(DirectoryError::Validation("node name is empty".into()));
        }

        self.registry.insert(dataset_id, node_name.to_string())?;
        tracing::debug!(dataset = dataset_id, node = node_name, "lookup entry upserted");
        Ok(())
    }

    fn remove_dataset_lookup_entry(&self, dataset_id: &str) -> Result<(), DirectoryError> {
        if dataset_id.is_empty() {
            return Err(DirectoryError::Validation(
                "dataset identifier is empty".into(),
            ));
        }
        self.registry.remove(dataset_id)
    }

    fn dataset_lookup_node_name(&self, dataset_id: &str) -> Option<String> {
        self.registry.get(dataset_id)
    }

    fn dataset_identifiers(&self) -> Vec<String> {
        self.registry.identifiers()
    }

    fn dataset_identifiers_for_node(&self, node_name: &str) -> Result<Vec<String>, DirectoryError> {
        if node_name.is_empty() {
            return Err(DirectoryError::Validation("node name is empty".into()));
        }
        self.db.dataset_identifiers_for_node(node_name)
    }
}

impl DatasetLookupService {
    /// Resolves a dataset identifier to the full node record, joining the
    /// lookup entry against the membership registry.
    pub fn dataset_lookup_node(
        &self,
        dataset_id: &str,
        membership: &dyn crate::directory::core::MembershipDirectory,
    ) -> Option<Node> {
        let owner = self.registry.get(dataset_id)?;
        membership.network_node(&owner)
    }
}
