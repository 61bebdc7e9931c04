#![warn(missing_docs)]
//! This module implemented message handler of the chord ring.
/// Message Flow:
/// +----------+    +------------------------------+
/// | Envelope | -> | MessageHandler.handle_message |
/// +----------+    +------------------------------+
///                  ||                          ||
///     +-----------------------+    +-----------------------+
///     | Ring state (PeerRing) |    |  Node Callback        |
///     +-----------------------+    +-----------------------+
///                  ||
///     +-------------------------------+
///     | MessageHandlerEvent -> Swarm  |
///     +-------------------------------+
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;

use super::Envelope;
use super::FindSuccessorSend;
use super::FindSuccessorThen;
use super::Message;
use super::NotifyPredecessorSend;
use super::QueryPredecessorSend;
use crate::dht::Bootstrap;
use crate::dht::NodeId;
use crate::dht::NodeRef;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Error;
use crate::error::Result;
use crate::swarm::callback::SharedNodeCallback;

/// Operator and Handler for CustomMessage
pub mod custom;
/// For handle dht related actions
pub mod dht;
/// Operator and handler for DHT stablization
pub mod stabilization;
/// Operator and Handler for keyed operations
pub mod storage;

/// MessageHandlerEvent that will be handled by Swarm.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageHandlerEvent {
    /// Instructs the swarm to send a new message from current node to a member.
    SendMessage(Message, NodeRef),

    /// Instructs the swarm to send a new message to a bootstrap endpoint.
    SendToBootstrap(Message, Bootstrap),

    /// Instructs the swarm to send a message as a response to the received envelope.
    SendReportMessage(Envelope, Message),

    /// Tell swarm to forward the envelope one hop to the given member.
    ForwardPayload(Envelope, NodeRef),
}

/// MessageHandler applies inbound messages to the ring state.
#[derive(Clone)]
pub struct MessageHandler {
    dht: Arc<PeerRing>,
    callback: Arc<RwLock<Option<SharedNodeCallback>>>,
}

/// Where a message addressed to an id goes from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NextHop {
    /// Current node owns the id.
    Local,
    /// One hop closer to the owner.
    Forward(NodeRef),
    /// Current node cannot route yet.
    Drop,
}

/// Generic trait for handle message ,inspired by Actor-Model.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&self, ctx: &Envelope, msg: &T) -> Result<Vec<MessageHandlerEvent>>;
}

impl MessageHandler {
    /// Create a new MessageHandler Instance.
    pub fn new(dht: Arc<PeerRing>, callback: Option<SharedNodeCallback>) -> Self {
        Self {
            dht,
            callback: Arc::new(RwLock::new(callback)),
        }
    }

    /// Replace the registered callback.
    pub fn set_callback(&self, callback: Option<SharedNodeCallback>) -> Result<()> {
        let mut cb = self
            .callback
            .write()
            .map_err(|_| Error::CallbackSyncLockError)?;
        *cb = callback;
        Ok(())
    }

    /// The registered callback, cloned out of its lock.
    pub(crate) fn callback(&self) -> Result<Option<SharedNodeCallback>> {
        Ok(self
            .callback
            .read()
            .map_err(|_| Error::CallbackSyncLockError)?
            .clone())
    }

    /// Decide the next hop of a message addressed to `id`.
    pub(crate) fn next_hop(&self, id: NodeId) -> Result<NextHop> {
        Ok(match self.dht.find_successor(id)? {
            PeerRingAction::Some(node) if node.id == self.dht.id => NextHop::Local,
            PeerRingAction::Some(node) => NextHop::Forward(node),
            PeerRingAction::RemoteAction(next, _) => NextHop::Forward(next),
            _ => NextHop::Drop,
        })
    }

    /// Turn a [PeerRingAction] into the messages it calls for.
    pub fn dht_events(&self, act: &PeerRingAction) -> Vec<MessageHandlerEvent> {
        match act {
            PeerRingAction::None | PeerRingAction::Some(_) => vec![],
            PeerRingAction::Join(bootstrap) => vec![MessageHandlerEvent::SendToBootstrap(
                Message::FindSuccessorSend(FindSuccessorSend {
                    id: self.dht.id,
                    then: FindSuccessorThen::Join,
                }),
                bootstrap.clone(),
            )],
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::FindSuccessorForFix(id, i)) => {
                vec![MessageHandlerEvent::SendMessage(
                    Message::FindSuccessorSend(FindSuccessorSend {
                        id: *id,
                        then: FindSuccessorThen::FixFinger(*i),
                    }),
                    next.clone(),
                )]
            }
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::Notify) => {
                vec![MessageHandlerEvent::SendMessage(
                    Message::NotifyPredecessorSend(NotifyPredecessorSend { id: next.id }),
                    next.clone(),
                )]
            }
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::QueryPredecessor) => {
                vec![MessageHandlerEvent::SendMessage(
                    Message::QueryPredecessorSend(QueryPredecessorSend { id: next.id }),
                    next.clone(),
                )]
            }
            PeerRingAction::RemoteAction(_, PeerRingRemoteAction::FindSuccessor(_)) => {
                // only produced while routing, where the envelope is forwarded as is
                tracing::error!("Invalid PeerRing Action {:?}", act);
                vec![]
            }
            PeerRingAction::MultiActions(acts) => {
                acts.iter().flat_map(|a| self.dht_events(a)).collect()
            }
        }
    }

    /// Handle an inbound envelope and return what should be sent next.
    pub async fn handle_message(&self, envelope: &Envelope) -> Result<Vec<MessageHandlerEvent>> {
        tracing::debug!(
            "START HANDLE MESSAGE: {} type {:?} from {}",
            self.dht.id,
            envelope.message.message_type(),
            envelope.from
        );

        let events = match &envelope.message {
            Message::CustomMessage(ref msg) => self.handle(envelope, msg).await,
            Message::FindSuccessorSend(ref msg) => self.handle(envelope, msg).await,
            Message::FindSuccessorReport(ref msg) => self.handle(envelope, msg).await,
            Message::NotifyPredecessorSend(ref msg) => self.handle(envelope, msg).await,
            Message::QueryPredecessorSend(ref msg) => self.handle(envelope, msg).await,
            Message::QueryPredecessorReport(ref msg) => self.handle(envelope, msg).await,
            Message::KeyedOperationSend(ref msg) => self.handle(envelope, msg).await,
        }?;

        tracing::debug!("FINISH HANDLE MESSAGE: {} -> {} events", self.dht.id, events.len());
        Ok(events)
    }
}
