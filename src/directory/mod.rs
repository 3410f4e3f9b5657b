//! Directory Server Module
//!
//! The coordinator. Storage nodes join via a handshake, announce and
//! synchronize the dataset identifiers they serve over signed direct
//! messages, and policy batches arrive as gossip deliveries that are
//! verified, deduplicated, and applied to the checkout state.
//!
//! ## Submodules
//! - **`core`**: the `DirectoryServerCore` coordinator and the trait seams
//!   its collaborators are injected through.
//! - **`protocol`**: the signed bincode message envelope and the HTTP DTOs.
//! - **`transport`**: the unicast send-with-response substrate and the UDP
//!   envelope listener.
//! - **`handlers`**: the axum operator API (handshake, network queries,
//!   dataset checkout).

pub mod core;
pub mod handlers;
pub mod protocol;
pub mod transport;
