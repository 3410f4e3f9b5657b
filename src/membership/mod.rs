//! Membership Module
//!
//! The network membership registry: every storage node that performs a
//! handshake against the directory server lands here. Records are kept in
//! a cache-backed registry — reads are served from memory where possible,
//! while the `network_nodes` table remains the durable source of truth.
//!
//! Registration is an upsert keyed by node name: a node re-handshaking
//! after a restart overwrites its previous record instead of duplicating
//! it. Nodes are removed only by explicit eviction; there is no automatic
//! expiry.

pub mod manager;
pub mod types;

#[cfg(test)]
mod tests;
