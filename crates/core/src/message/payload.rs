use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::Message;
use crate::dht::NodeId;
use crate::dht::NodeRef;
use crate::error::Error;
use crate::error::Result;

/// The unit exchanged between ring members. Immutable once sent; forwarding
/// keeps `message` and `from` and only readdresses `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The message itself.
    pub message: Message,
    /// The origin. Replies go back here.
    pub from: NodeRef,
    /// The member this hop is meant for. Absent when only the endpoint is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NodeRef>,
}

impl Envelope {
    /// Create an envelope from `from` addressed to `to`.
    pub fn new(message: Message, from: NodeRef, to: Option<NodeRef>) -> Self {
        Self { message, from, to }
    }

    /// The same envelope readdressed to the next hop.
    pub fn forward_to(&self, next: &NodeRef) -> Self {
        Self {
            message: self.message.clone(),
            from: self.from.clone(),
            to: Some(next.clone()),
        }
    }

    /// The id the receiving process should demultiplex on: `to` when set,
    /// the message id otherwise.
    pub fn target_id(&self) -> NodeId {
        self.to
            .as_ref()
            .map(|to| to.id)
            .unwrap_or_else(|| self.message.id())
    }

    /// Parse a text frame.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }

    /// Render as a text frame.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Serialize)
    }
}

/// Trait of PayloadSender
#[async_trait]
pub trait PayloadSender: Send + Sync {
    /// Hand `envelope` to the process listening on `address:port`.
    /// Fire-and-forget; an `Ok` says nothing about delivery.
    async fn send_payload(&self, address: &str, port: u16, envelope: &Envelope) -> Result<()>;

    /// Send to a known member.
    async fn send_to(&self, to: &NodeRef, envelope: &Envelope) -> Result<()> {
        self.send_payload(&to.address, to.port, envelope).await
    }
}
