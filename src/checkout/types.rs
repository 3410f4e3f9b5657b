use serde::{Deserialize, Serialize};

/// One client's recorded retrieval of a dataset. Never mutated after
/// insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutRecord {
    pub dataset_id: String,

    /// Opaque token identifying the checking-out client.
    pub client_token: String,

    /// Unix-epoch milliseconds of the checkout.
    pub checkout_time_ms: i64,
}

impl CheckoutRecord {
    pub fn new(dataset_id: &str, client_token: &str) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            client_token: client_token.to_string(),
            checkout_time_ms: crate::now_ms(),
        }
    }
}
