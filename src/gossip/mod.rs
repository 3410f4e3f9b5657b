//! Gossip Module
//!
//! Gossip delivery is best-effort, unordered, and at-least-once; this
//! module supplies the two pieces the directory server needs on top of
//! that substrate: the policy-batch payload types and the observation
//! ledger that reduces at-least-once delivery to at-most-once effect.

pub mod observer;
pub mod types;
