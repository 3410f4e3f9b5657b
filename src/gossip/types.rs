use serde::{Deserialize, Serialize};

/// An access-control decision for one dataset. The policy content is
/// opaque to the directory server beyond the identifier and the decision
/// flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    pub dataset_id: String,
    pub allowed: bool,
}

/// One entry of a policy batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GossipEntry {
    pub policy: Policy,
}

/// A policy batch disseminated through the gossip network. The `id` is
/// the deduplication key: a batch observed twice must only be applied
/// once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GossipMessage {
    pub id: String,
    pub body: Vec<GossipEntry>,
}

impl GossipMessage {
    pub fn new(body: Vec<GossipEntry>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            body,
        }
    }
}
