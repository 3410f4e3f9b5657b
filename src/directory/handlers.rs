use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use std::sync::Arc;

use crate::directory::core::DirectoryServerCore;
use crate::directory::protocol::{
    CheckoutReply, CheckoutRequest, CheckoutsResponse, DatasetIdentifiersResponse, HandshakeReply,
    NodesResponse,
};
use crate::error::DirectoryError;
use crate::membership::types::Node;

fn status_for(err: &DirectoryError) -> StatusCode {
    match err {
        DirectoryError::Validation(_) | DirectoryError::UnknownMessageType(_) => {
            StatusCode::BAD_REQUEST
        }
        DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
        DirectoryError::Conflict(_) => StatusCode::CONFLICT,
        DirectoryError::Authentication(_) => StatusCode::UNAUTHORIZED,
        DirectoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DirectoryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Join RPC: registers the node and returns the directory server's
/// gossip address and public identity.
pub async fn handle_handshake(
    Extension(core): Extension<Arc<DirectoryServerCore>>,
    Json(node): Json<Node>,
) -> (StatusCode, Json<HandshakeReply>) {
    match core.handshake(&node) {
        Ok(resp) => (
            StatusCode::OK,
            Json(HandshakeReply {
                address: Some(resp.address),
                identity: Some(resp.identity),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("handshake rejected: {e}");
            (
                status_for(&e),
                Json(HandshakeReply {
                    address: None,
                    identity: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_list_nodes(
    Extension(core): Extension<Arc<DirectoryServerCore>>,
) -> (StatusCode, Json<NodesResponse>) {
    let nodes = core.membership().network_nodes().into_values().collect();
    (StatusCode::OK, Json(NodesResponse { nodes }))
}

pub async fn handle_list_datasets(
    Extension(core): Extension<Arc<DirectoryServerCore>>,
) -> (StatusCode, Json<DatasetIdentifiersResponse>) {
    let identifiers = core.lookup().dataset_identifiers();
    (
        StatusCode::OK,
        Json(DatasetIdentifiersResponse { identifiers }),
    )
}

/// Client checkout pipeline: 404 for unannounced datasets, 409 when the
/// exclusivity policy rejects the request.
pub async fn handle_checkout(
    Extension(core): Extension<Arc<DirectoryServerCore>>,
    Json(req): Json<CheckoutRequest>,
) -> (StatusCode, Json<CheckoutReply>) {
    match core.checkout_dataset(&req.dataset_id, &req.client_token) {
        Ok(()) => (
            StatusCode::OK,
            Json(CheckoutReply {
                success: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(dataset = %req.dataset_id, "checkout rejected: {e}");
            (
                status_for(&e),
                Json(CheckoutReply {
                    success: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Full audit list of checkouts for a dataset.
pub async fn handle_dataset_checkouts(
    Extension(core): Extension<Arc<DirectoryServerCore>>,
    Path(dataset_id): Path<String>,
) -> (StatusCode, Json<CheckoutsResponse>) {
    match core.checkouts().dataset_checkouts(&dataset_id) {
        Ok(checkouts) => (
            StatusCode::OK,
            Json(CheckoutsResponse {
                dataset_id,
                checkouts,
            }),
        ),
        Err(e) => {
            tracing::error!(dataset = %dataset_id, "checkout audit query failed: {e}");
            (
                status_for(&e),
                Json(CheckoutsResponse {
                    dataset_id,
                    checkouts: Vec::new(),
                }),
            )
        }
    }
}
