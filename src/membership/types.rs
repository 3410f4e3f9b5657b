use serde::{Deserialize, Serialize};

/// Identity record of a storage node registered with the directory server.
///
/// The `name` is the registry key: re-registration under the same name
/// overwrites the previous record (upsert) rather than duplicating it.
/// `public_id` carries the node's public identity bytes, used to verify
/// signatures on messages the node originates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub name: String,

    /// Address the node's gossip transport listens on (`host:port`).
    pub gossip_addr: String,

    /// Public identity bytes of the node's signing keypair.
    pub public_id: Vec<u8>,

    /// Address of the node's HTTPS data-serving surface.
    pub https_addr: String,

    pub port: u16,

    /// Unix-epoch milliseconds at which the node booted.
    pub boot_time_ms: i64,
}

impl Node {
    /// A descriptor is usable only if it carries a non-empty name.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}
