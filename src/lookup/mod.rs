//! Dataset Lookup Module
//!
//! Maps globally unique dataset identifiers to the name of the node that
//! owns them. Second instantiation of the cache-backed registry pattern:
//! last-writer-wins upserts, store-authoritative removals, and a
//! per-node identifier listing used by delta resolution when a node
//! re-announces its full dataset set.

pub mod service;
