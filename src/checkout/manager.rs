use std::sync::Arc;

use crate::checkout::types::CheckoutRecord;
use crate::directory::core::CheckoutTracker;
use crate::error::DirectoryError;
use crate::store::sqlite::DirectoryDb;

/// Owns the checkout table and the exclusivity policy.
pub struct CheckoutManager {
    db: Arc<DirectoryDb>,

    /// When false (the default), at most one active checkout may exist
    /// per dataset.
    allow_multiple: bool,
}

impl CheckoutManager {
    pub fn new(db: Arc<DirectoryDb>, allow_multiple: bool) -> Self {
        Self { db, allow_multiple }
    }
}

impl CheckoutTracker for CheckoutManager {
    fn checkout_dataset(&self, record: &CheckoutRecord) -> Result<(), DirectoryError> {
        if record.dataset_id.is_empty() {
            return Err(DirectoryError::Validation(
                "dataset identifier is empty".into(),
            ));
        }
        if record.client_token.is_empty() {
            return Err(DirectoryError::Validation("client token is empty".into()));
        }

        let inserted = self.db.insert_checkout(record, !self.allow_multiple)?;
        if !inserted {
            return Err(DirectoryError::Conflict(format!(
                "dataset '{}' is already checked out",
                record.dataset_id
            )));
        }

        tracing::info!(
            dataset = %record.dataset_id,
            client = %record.client_token,
            "dataset checked out"
        );
        Ok(())
    }

    fn dataset_is_checked_out(&self, dataset_id: &str) -> bool {
        match self.db.is_checked_out(dataset_id) {
            Ok(checked_out) => checked_out,
            Err(e) => {
                tracing::error!(dataset = dataset_id, "checkout query failed: {e}");
                false
            }
        }
    }

    fn dataset_is_checked_out_by_client(&self, dataset_id: &str, client_token: &str) -> bool {
        match self.db.is_checked_out_by_client(dataset_id, client_token) {
            Ok(checked_out) => checked_out,
            Err(e) => {
                tracing::error!(dataset = dataset_id, "checkout query failed: {e}");
                false
            }
        }
    }

    fn dataset_checkouts(&self, dataset_id: &str) -> Result<Vec<CheckoutRecord>, DirectoryError> {
        if dataset_id.is_empty() {
            return Err(DirectoryError::Validation(
                "dataset identifier is empty".into(),
            ));
        }
        self.db.checkouts(dataset_id)
    }
}
