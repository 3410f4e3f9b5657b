//! Dataset Checkout Module
//!
//! Tracks which clients have checked out which datasets and enforces the
//! single/multiple-checkout policy. Checkout records are append-only and
//! serve as the audit history; releasing a checkout (check-in) is not part
//! of this core.
//!
//! The exclusivity check and the insert are a single conditional SQL
//! statement, so two concurrent checkouts of the same dataset can never
//! both succeed when multiple checkout is disabled — the database is the
//! final arbiter, and no in-process lock is held across store I/O.

pub mod manager;
pub mod types;
