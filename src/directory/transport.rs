use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::UdpSocket;

use crate::directory::core::{DirectoryServerCore, MessageTransport};
use crate::directory::protocol::{Message, MessageType};
use crate::error::DirectoryError;

const MAX_DATAGRAM: usize = 65_536;

/// Point-to-point UDP implementation of the messaging substrate. Each
/// exchange uses an ephemeral socket; the caller supplies the deadline
/// that bounds the wait.
pub struct UdpMessageTransport;

#[async_trait]
impl MessageTransport for UdpMessageTransport {
    async fn send_with_response(
        &self,
        addr: &str,
        data: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, DirectoryError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("udp bind: {e}")))?;

        socket
            .send_to(&data, addr)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("udp send to {addr}: {e}")))?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _) = socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("udp recv from {addr}: {e}")))?;

        buf.truncate(len);
        Ok(Some(buf))
    }
}

/// Receive loop of the directory server's gossip endpoint. Decodes each
/// datagram just far enough to route it: gossip-typed envelopes go to the
/// gossip handler (no reply), everything else is a direct message whose
/// signed acknowledgement or error envelope is written back to the
/// sender.
pub async fn serve_envelopes(socket: UdpSocket, core: Arc<DirectoryServerCore>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                tracing::error!("failed to receive datagram: {e}");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }
        };
        let data = &buf[..len];

        let msg_type = match Message::decode(data) {
            Ok(msg) => msg.msg_type,
            Err(e) => {
                tracing::warn!(peer = %src, "failed to decode envelope: {e}");
                continue;
            }
        };

        match msg_type {
            MessageType::Probe | MessageType::PolicyStoreUpdate => {
                if let Err(e) = core.gossip_message_handler(data) {
                    tracing::error!(peer = %src, "gossip handler failed: {e}");
                }
            }
            _ => {
                let reply = match core.message_handler(data) {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::error!(peer = %src, "message handler failed: {e}");
                        match core.signed_error_reply(&e) {
                            Ok(reply) => reply,
                            Err(encode_err) => {
                                tracing::error!("failed to build error reply: {encode_err}");
                                continue;
                            }
                        }
                    }
                };

                if let Err(e) = socket.send_to(&reply, src).await {
                    tracing::warn!(peer = %src, "failed to send reply: {e}");
                }
            }
        }
    }
}
