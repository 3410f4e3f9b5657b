//! Federated Data-Access Directory Server
//!
//! This library crate defines the control plane for federated data-access
//! governance: independent storage nodes register with a coordinating
//! directory server, advertise the datasets they hold, and receive access
//! policies disseminated through a gossip network.
//!
//! ## Architecture Modules
//! - **`membership`**: the network membership registry. Nodes join via a
//!   handshake and are kept in a cache-backed registry over the node table.
//! - **`lookup`**: the dataset lookup service mapping dataset identifiers
//!   to their owning nodes, with delta resolution when a node re-announces
//!   its full set.
//! - **`checkout`**: the dataset checkout manager enforcing the
//!   single/multiple-checkout policy and keeping the audit history.
//! - **`registry`**: the generic cache-over-store pattern shared by
//!   membership and lookup.
//! - **`auth`**: signing and verification of control-plane messages with
//!   the node's identity keypair.
//! - **`gossip`**: policy-batch payload types and the observation ledger
//!   that makes at-least-once gossip delivery have at-most-once effect.
//! - **`store`**: the SQLite persistent store behind every cache.
//! - **`directory`**: the coordinator wiring it all together — message
//!   handlers, wire protocol, transport listener, and the HTTP operator
//!   API.

pub mod auth;
pub mod checkout;
pub mod directory;
pub mod error;
pub mod gossip;
pub mod lookup;
pub mod membership;
pub mod registry;
pub mod store;

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
