//! Persistent Store Module
//!
//! Durable relational storage for the three directory tables: network
//! membership, dataset lookup, and dataset checkouts. The store is the
//! authoritative tier behind every in-memory cache — a cache flush or a
//! process restart can lose locality, never data.
//!
//! ## Tables
//! - **`network_nodes`**: one row per registered node, keyed by node name.
//! - **`dataset_lookup`**: dataset identifier -> owning node name.
//! - **`dataset_checkouts`**: append-only audit of (dataset, client) checkouts.

pub mod sqlite;

#[cfg(test)]
mod tests;
