use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::directory::core::GossipObservation;
use crate::error::DirectoryError;
use crate::gossip::types::GossipMessage;

const DEFAULT_OBSERVED_CAP: usize = 65_536;

/// Ledger of gossip message identifiers that have already been processed.
///
/// Retention is bounded: once the ledger grows past its cap it is flushed
/// wholesale before the next insert. A flushed identifier could in theory
/// be re-applied if the network re-delivers it much later; the cap is
/// sized so that window is irrelevant for a control plane.
pub struct GossipObserver {
    observed: DashMap<String, i64>,
    cap: usize,
}

impl GossipObserver {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_OBSERVED_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            observed: DashMap::new(),
            cap,
        }
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }
}

impl Default for GossipObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl GossipObservation for GossipObserver {
    /// Records the message's identifier. Returns `true` on first
    /// observation, `false` if the identifier was already in the ledger.
    /// The test-and-record is atomic, so a message delivered twice
    /// concurrently yields exactly one `true`.
    fn insert_observed_gossip(&self, message: &GossipMessage) -> Result<bool, DirectoryError> {
        if message.id.is_empty() {
            return Err(DirectoryError::Validation(
                "gossip message id is empty".into(),
            ));
        }

        if self.observed.len() >= self.cap {
            tracing::warn!(
                entries = self.observed.len(),
                "observation ledger at capacity, flushing"
            );
            self.observed.clear();
        }

        match self.observed.entry(message.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(crate::now_ms());
                Ok(true)
            }
        }
    }

    fn gossip_is_observed(&self, message: &GossipMessage) -> bool {
        self.observed.contains_key(&message.id)
    }
}
