use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::MessageAuthenticator;
use crate::checkout::types::CheckoutRecord;
use crate::directory::protocol::{HandshakeResponse, Message, MessageType};
use crate::error::DirectoryError;
use crate::gossip::types::{GossipMessage, Policy};
use crate::membership::types::Node;

/// Membership registry seam.
pub trait MembershipDirectory: Send + Sync {
    fn network_nodes(&self) -> HashMap<String, Node>;
    fn network_node(&self, node_name: &str) -> Option<Node>;
    fn add_network_node(&self, node_name: &str, node: &Node) -> Result<(), DirectoryError>;
    fn network_node_exists(&self, node_name: &str) -> bool;
    fn remove_network_node(&self, node_name: &str) -> Result<(), DirectoryError>;
}

/// Dataset lookup seam.
pub trait DatasetLookup: Send + Sync {
    fn dataset_node_exists(&self, dataset_id: &str) -> bool;
    fn insert_dataset_lookup_entry(
        &self,
        dataset_id: &str,
        node_name: &str,
    ) -> Result<(), DirectoryError>;
    fn remove_dataset_lookup_entry(&self, dataset_id: &str) -> Result<(), DirectoryError>;
    fn dataset_lookup_node_name(&self, dataset_id: &str) -> Option<String>;
    fn dataset_identifiers(&self) -> Vec<String>;
    fn dataset_identifiers_for_node(&self, node_name: &str) -> Result<Vec<String>, DirectoryError>;
}

/// Checkout state seam.
pub trait CheckoutTracker: Send + Sync {
    fn checkout_dataset(&self, record: &CheckoutRecord) -> Result<(), DirectoryError>;
    fn dataset_is_checked_out(&self, dataset_id: &str) -> bool;
    fn dataset_is_checked_out_by_client(&self, dataset_id: &str, client_token: &str) -> bool;
    fn dataset_checkouts(&self, dataset_id: &str) -> Result<Vec<CheckoutRecord>, DirectoryError>;
}

/// Gossip deduplication seam.
pub trait GossipObservation: Send + Sync {
    /// Atomic test-and-record; `true` means first observation.
    fn insert_observed_gossip(&self, message: &GossipMessage) -> Result<bool, DirectoryError>;
    fn gossip_is_observed(&self, message: &GossipMessage) -> bool;
}

/// Session/notification collaborator that pushes applied policies to
/// whoever holds active checkouts. External to this core beyond the
/// enablement condition.
pub trait PolicyNotifier: Send + Sync {
    fn publish_policy(&self, policy: &Policy);
}

/// Unicast messaging substrate. `Ok(None)` means the peer closed the
/// exchange without a reply, which is treated as delivery.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_with_response(
        &self,
        addr: &str,
        data: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, DirectoryError>;
}

/// `PolicyNotifier` that only logs; the default wiring until a session
/// service is attached.
pub struct LoggingPolicyNotifier;

impl PolicyNotifier for LoggingPolicyNotifier {
    fn publish_policy(&self, policy: &Policy) {
        tracing::info!(
            dataset = %policy.dataset_id,
            allowed = policy.allowed,
            "policy published to active checkout holders"
        );
    }
}

/// Lifecycle of a compensating rollback exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RollbackState {
    Sent,
    Acked,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Human-readable name of the directory server.
    pub name: String,
    pub hostname: String,
    /// Port of the gossip/direct-message endpoint.
    pub gossip_port: u16,
    /// Address of the HTTPS operator surface, advertised in the local
    /// node descriptor.
    pub https_addr: String,
}

/// The coordinator. Composes the membership registry, dataset lookup,
/// checkout tracker, gossip observer, policy notifier, and messaging
/// transport through narrow interfaces; owns none of their state
/// directly.
pub struct DirectoryServerCore {
    config: DirectoryConfig,
    authenticator: Arc<MessageAuthenticator>,
    membership: Arc<dyn MembershipDirectory>,
    lookup: Arc<dyn DatasetLookup>,
    checkouts: Arc<dyn CheckoutTracker>,
    gossip_obs: Arc<dyn GossipObservation>,
    notifier: Arc<dyn PolicyNotifier>,
    transport: Arc<dyn MessageTransport>,
    boot_time_ms: i64,
}

impl DirectoryServerCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DirectoryConfig,
        authenticator: Arc<MessageAuthenticator>,
        membership: Arc<dyn MembershipDirectory>,
        lookup: Arc<dyn DatasetLookup>,
        checkouts: Arc<dyn CheckoutTracker>,
        gossip_obs: Arc<dyn GossipObservation>,
        notifier: Arc<dyn PolicyNotifier>,
        transport: Arc<dyn MessageTransport>,
    ) -> Result<Self, DirectoryError> {
        if config.name.is_empty() {
            return Err(DirectoryError::Validation(
                "directory server name is empty".into(),
            ));
        }
        if config.hostname.is_empty() {
            return Err(DirectoryError::Validation("hostname is empty".into()));
        }

        Ok(Self {
            config,
            authenticator,
            membership,
            lookup,
            checkouts,
            gossip_obs,
            notifier,
            transport,
            boot_time_ms: crate::now_ms(),
        })
    }

    pub fn membership(&self) -> &dyn MembershipDirectory {
        self.membership.as_ref()
    }

    pub fn lookup(&self) -> &dyn DatasetLookup {
        self.lookup.as_ref()
    }

    pub fn checkouts(&self) -> &dyn CheckoutTracker {
        self.checkouts.as_ref()
    }

    /// The directory server's own node descriptor, used as the sender of
    /// outbound messages.
    pub fn local_node(&self) -> Node {
        Node {
            name: self.config.name.clone(),
            gossip_addr: self.gossip_addr(),
            public_id: self.authenticator.public_id(),
            https_addr: self.config.https_addr.clone(),
            port: self.config.gossip_port,
            boot_time_ms: self.boot_time_ms,
        }
    }

    fn gossip_addr(&self) -> String {
        format!("{}:{}", self.config.hostname, self.config.gossip_port)
    }

    /// Registers a joining node (upsert) and returns the directory
    /// server's reachable address and identity so the node can address
    /// future messages.
    pub fn handshake(&self, node: &Node) -> Result<HandshakeResponse, DirectoryError> {
        if !node.is_valid() {
            return Err(DirectoryError::Validation(
                "handshake node descriptor has no name".into(),
            ));
        }

        self.membership.add_network_node(&node.name, node)?;

        tracing::info!(
            node = %node.name,
            gossip_addr = %node.gossip_addr,
            https_addr = %node.https_addr,
            "handshake completed"
        );

        Ok(HandshakeResponse {
            address: self.gossip_addr(),
            identity: self.authenticator.public_id(),
        })
    }

    /// Handles a direct message: decode, verify the signature (a hard
    /// gate — an unverified payload is never applied), dispatch by type,
    /// and return a signed acknowledgement.
    pub fn message_handler(&self, data: &[u8]) -> Result<Vec<u8>, DirectoryError> {
        let msg = Message::decode(data)?;
        self.verify_message_signature(&msg)?;

        let sender = msg
            .sender
            .as_ref()
            .ok_or_else(|| DirectoryError::Validation("message has no sender".into()))?;

        match msg.msg_type {
            MessageType::AddDatasetIdentifier => {
                let dataset_id = msg
                    .string_value
                    .as_deref()
                    .ok_or_else(|| {
                        DirectoryError::Validation("add-dataset message has no identifier".into())
                    })?;
                self.lookup
                    .insert_dataset_lookup_entry(dataset_id, &sender.name)
                    .map_err(|e| {
                        tracing::error!(dataset = dataset_id, "dataset lookup insert failed: {e}");
                        e
                    })?;
            }

            MessageType::SynchronizeDatasetIdentifiers => {
                let identifiers = msg.string_slice.as_deref().ok_or_else(|| {
                    DirectoryError::Validation("synchronize message has no identifier list".into())
                })?;
                self.resolve_dataset_identifier_deltas(identifiers, sender)?;
            }

            other => {
                let err = DirectoryError::UnknownMessageType(format!("{other:?}"));
                tracing::error!("{err}");
                return Err(err);
            }
        }

        self.signed_reply(MessageType::Ok)
    }

    /// Reconciles a node's currently advertised identifier set against
    /// the lookup table: every advertised identifier is upserted to the
    /// sender, and entries the sender no longer advertises are removed.
    /// Entries owned by other nodes are never touched.
    fn resolve_dataset_identifier_deltas(
        &self,
        new_identifiers: &[String],
        node: &Node,
    ) -> Result<(), DirectoryError> {
        if !node.is_valid() {
            return Err(DirectoryError::Validation("node has no name".into()));
        }

        let advertised: HashSet<&str> = new_identifiers.iter().map(String::as_str).collect();

        for dataset_id in new_identifiers {
            if dataset_id.is_empty() {
                tracing::warn!(node = %node.name, "skipping empty dataset identifier");
                continue;
            }
            // Bulk reconciliation tolerates partial failure; a failed
            // upsert is retried on the node's next synchronization.
            if let Err(e) = self
                .lookup
                .insert_dataset_lookup_entry(dataset_id, &node.name)
            {
                tracing::error!(dataset = %dataset_id, "delta upsert failed: {e}");
            }
        }

        let current = self.lookup.dataset_identifiers_for_node(&node.name)?;
        for stale in current
            .iter()
            .filter(|id| !advertised.contains(id.as_str()))
        {
            tracing::info!(
                dataset = %stale,
                node = %node.name,
                "removing lookup entry no longer advertised"
            );
            if let Err(e) = self.lookup.remove_dataset_lookup_entry(stale) {
                tracing::error!(dataset = %stale, "delta removal failed: {e}");
            }
        }

        Ok(())
    }

    /// Handles a gossip delivery. Signature failures are logged but not
    /// fatal — gossip is best-effort and the transport already re-delivers.
    /// The observation ledger gates payload application to at-most-once.
    pub fn gossip_message_handler(&self, data: &[u8]) -> Result<Option<Vec<u8>>, DirectoryError> {
        let msg = Message::decode(data)?;
        tracing::debug!(msg_type = ?msg.msg_type, "received gossip message");

        if let Err(e) = self.verify_message_signature(&msg) {
            tracing::warn!("gossip signature not verified: {e}");
        }

        match msg.msg_type {
            MessageType::Probe => Ok(None),

            MessageType::PolicyStoreUpdate => {
                let gossip = msg.gossip_message.as_ref().ok_or_else(|| {
                    DirectoryError::Validation("policy update carries no gossip message".into())
                })?;

                match self.gossip_obs.insert_observed_gossip(gossip) {
                    Ok(true) => self.process_policy_batch(gossip)?,
                    Ok(false) => {
                        tracing::debug!(id = %gossip.id, "gossip message already observed, skipping");
                    }
                    Err(e) => {
                        // Ledger trouble must not silence the network;
                        // favor applying over dropping.
                        tracing::error!("observation ledger insert failed: {e}");
                        self.process_policy_batch(gossip)?;
                    }
                }
                Ok(None)
            }

            other => {
                tracing::warn!(msg_type = ?other, "unknown gossip message type");
                Ok(None)
            }
        }
    }

    /// Applies every policy in the batch, continuing past individual
    /// failures: one bad entry must not abort the rest.
    fn process_policy_batch(&self, gossip: &GossipMessage) -> Result<(), DirectoryError> {
        if gossip.body.is_empty() {
            tracing::warn!(id = %gossip.id, "policy batch is empty");
            return Ok(());
        }

        for entry in &gossip.body {
            if let Err(e) = self.apply_policy(&entry.policy) {
                tracing::error!(
                    dataset = %entry.policy.dataset_id,
                    "policy application failed: {e}"
                );
            }
        }

        Ok(())
    }

    /// A policy only has an enforcement effect while its dataset is
    /// checked out; otherwise it is a no-op here.
    pub fn apply_policy(&self, policy: &Policy) -> Result<(), DirectoryError> {
        if policy.dataset_id.is_empty() {
            return Err(DirectoryError::Validation(
                "policy has no dataset identifier".into(),
            ));
        }

        if self.checkouts.dataset_is_checked_out(&policy.dataset_id) {
            self.notifier.publish_policy(policy);
        } else {
            tracing::debug!(
                dataset = %policy.dataset_id,
                "no active checkout, policy has no effect"
            );
        }

        Ok(())
    }

    /// Validates that a dataset is announced, then records the checkout.
    /// Serves the operator API's checkout pipeline.
    pub fn checkout_dataset(
        &self,
        dataset_id: &str,
        client_token: &str,
    ) -> Result<(), DirectoryError> {
        if !self.lookup.dataset_node_exists(dataset_id) {
            return Err(DirectoryError::NotFound(format!(
                "dataset '{dataset_id}' is unknown to the directory server"
            )));
        }

        let record = CheckoutRecord::new(dataset_id, client_token);
        self.checkouts.checkout_dataset(&record)
    }

    /// Sends a signed rollback-checkout message to a node and waits for
    /// its reply, racing the given deadline. Compensates a multi-step
    /// checkout pipeline when a later step fails; a timed-out rollback is
    /// logged as unresolved, never treated as success.
    pub async fn rollback_checkout(
        &self,
        node_addr: &str,
        dataset_id: &str,
        deadline: Duration,
    ) -> Result<(), DirectoryError> {
        if node_addr.is_empty() || dataset_id.is_empty() {
            return Err(DirectoryError::Validation(
                "rollback needs a node address and a dataset identifier".into(),
            ));
        }

        let mut msg = Message::of_type(MessageType::RollbackCheckout);
        msg.sender = Some(self.local_node());
        msg.string_value = Some(dataset_id.to_string());
        let payload = msg.signing_payload()?;
        msg.signature = Some(self.authenticator.sign(&payload));
        let data = msg.encode()?;

        let mut state = RollbackState::Sent;
        tracing::info!(node = node_addr, dataset = dataset_id, ?state, "rollback sent");

        let exchange = self.transport.send_with_response(node_addr, data);
        match tokio::time::timeout(deadline, exchange).await {
            Ok(Ok(reply)) => {
                if let Some(bytes) = reply {
                    let reply_msg = Message::decode(&bytes)?;
                    self.verify_message_signature(&reply_msg)?;
                }
                state = RollbackState::Acked;
                tracing::info!(node = node_addr, dataset = dataset_id, ?state, "rollback acknowledged");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(node = node_addr, dataset = dataset_id, "rollback send failed: {e}");
                Err(e)
            }
            Err(_) => {
                state = RollbackState::TimedOut;
                tracing::error!(
                    node = node_addr,
                    dataset = dataset_id,
                    ?state,
                    "rollback unresolved: deadline elapsed"
                );
                Err(DirectoryError::Timeout(format!(
                    "rollback of dataset '{dataset_id}' on '{node_addr}' was not acknowledged"
                )))
            }
        }
    }

    /// Verifies the envelope signature against the sender's declared
    /// identity. The signature covers the envelope with its signature
    /// field cleared.
    fn verify_message_signature(&self, msg: &Message) -> Result<(), DirectoryError> {
        let signature = msg
            .signature
            .as_ref()
            .ok_or_else(|| DirectoryError::Authentication("message is unsigned".into()))?;
        let sender = msg
            .sender
            .as_ref()
            .ok_or_else(|| DirectoryError::Authentication("message has no sender".into()))?;

        let payload = msg.signing_payload()?;
        if !MessageAuthenticator::verify(signature, &payload, &sender.public_id) {
            return Err(DirectoryError::Authentication(format!(
                "could not verify the integrity of a message from '{}'",
                sender.name
            )));
        }

        Ok(())
    }

    /// Builds a signed reply envelope originating from this server.
    pub fn signed_reply(&self, msg_type: MessageType) -> Result<Vec<u8>, DirectoryError> {
        let mut reply = Message::of_type(msg_type);
        reply.sender = Some(self.local_node());
        let payload = reply.signing_payload()?;
        reply.signature = Some(self.authenticator.sign(&payload));
        reply.encode()
    }

    /// Builds a signed error envelope, used by the transport listener to
    /// report handler failures back to the sender.
    pub fn signed_error_reply(&self, error: &DirectoryError) -> Result<Vec<u8>, DirectoryError> {
        let mut reply = Message::of_type(MessageType::Error);
        reply.sender = Some(self.local_node());
        reply.string_value = Some(error.to_string());
        let payload = reply.signing_payload()?;
        reply.signature = Some(self.authenticator.sign(&payload));
        reply.encode()
    }
}
