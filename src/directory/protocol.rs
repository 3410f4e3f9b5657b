//! Directory Wire Protocol
//!
//! The signed control-plane envelope exchanged over the gossip transport,
//! plus the DTOs of the HTTP operator API.
//!
//! Envelopes are bincode-encoded. The signature covers the envelope bytes
//! with the signature field cleared, so both sides reproduce the exact
//! signed payload.

use serde::{Deserialize, Serialize};

use crate::auth::MsgSignature;
use crate::checkout::types::CheckoutRecord;
use crate::error::DirectoryError;
use crate::gossip::types::GossipMessage;
use crate::membership::types::Node;

/// Envelope discriminator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageType {
    /// A node announces a single dataset identifier it now serves.
    AddDatasetIdentifier,
    /// A node re-announces its complete identifier set for delta
    /// resolution.
    SynchronizeDatasetIdentifiers,
    /// Compensating message asking a node to undo a checkout step.
    RollbackCheckout,
    /// Gossip liveness probe; carries no payload.
    Probe,
    /// Gossip-disseminated policy batch.
    PolicyStoreUpdate,
    /// Positive acknowledgement.
    Ok,
    /// Error reply; `string_value` carries the description.
    Error,
}

/// The control-plane message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub msg_type: MessageType,
    pub sender: Option<Node>,
    pub string_value: Option<String>,
    pub string_slice: Option<Vec<String>>,
    pub gossip_message: Option<GossipMessage>,
    pub signature: Option<MsgSignature>,
}

impl Message {
    pub fn of_type(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            sender: None,
            string_value: None,
            string_slice: None,
            gossip_message: None,
            signature: None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, DirectoryError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self, DirectoryError> {
        Ok(bincode::deserialize(data)?)
    }

    /// The exact bytes a signature covers: this envelope serialized with
    /// the signature field cleared.
    pub fn signing_payload(&self) -> Result<Vec<u8>, DirectoryError> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        unsigned.encode()
    }
}

// --- HTTP operator API DTOs ---

/// Reply to a successful handshake: where to reach the directory server's
/// gossip endpoint and its public identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub address: String,
    pub identity: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HandshakeReply {
    pub address: Option<String>,
    pub identity: Option<Vec<u8>>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetIdentifiersResponse {
    pub identifiers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub dataset_id: String,
    pub client_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutReply {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutsResponse {
    pub dataset_id: String,
    pub checkouts: Vec<CheckoutRecord>,
}
