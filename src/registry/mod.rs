//! Cache-Backed Registry Module
//!
//! Implements the two-tier lookup pattern shared by the membership
//! registry and the dataset lookup service: an in-memory cache in front
//! of the persistent store.
//!
//! ## Tier Discipline
//! - **Reads**: cache first; on a miss (or cache-side error) fall through
//!   to the store, and repair the cache with what the store returned.
//! - **Writes**: the store write is authoritative and its errors
//!   propagate; the cache write is best-effort and never fails the
//!   operation.
//!
//! The cache is strictly an optimization layer — a flush or restart loses
//! locality, never data.

pub mod cache;

#[cfg(test)]
mod tests;
