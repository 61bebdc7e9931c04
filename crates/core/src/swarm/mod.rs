#![warn(missing_docs)]
//! Tranposrt management
//!
//! A [ChordNode] is one ring member: its ring state, the handler that applies
//! inbound messages to it, and the periodic stabilization task.
//! Several nodes may share one process and one [PayloadSender].

mod builder;
pub mod callback;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_recursion::async_recursion;
pub use builder::ChordNodeBuilder;
use serde_json::Value;

use self::callback::SharedNodeCallback;
use crate::dht::Bootstrap;
use crate::dht::IdSpace;
use crate::dht::KeyHasher;
use crate::dht::NodeId;
use crate::dht::NodeRef;
use crate::dht::NodeState;
use crate::dht::PeerRing;
use crate::dht::Stabilizer;
use crate::dht::StabilizerHandle;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::DHTInspect;
use crate::message::CustomMessage;
use crate::message::Envelope;
use crate::message::KeyedOperation;
use crate::message::KeyedOperationSend;
use crate::message::Message;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::PayloadSender;

/// The transport and dht management.
pub struct ChordNode {
    /// Ring state of current node.
    pub(crate) dht: Arc<PeerRing>,
    message_handler: MessageHandler,
    transport: Arc<dyn PayloadSender>,
    hasher: Arc<dyn KeyHasher>,
    stabilize_interval: Duration,
    stabilizer: Mutex<Option<StabilizerHandle>>,
}

impl ChordNode {
    /// Retrieves the id of current node.
    pub fn id(&self) -> NodeId {
        self.dht.id
    }

    /// The descriptor other members use to reach current node.
    pub fn node_ref(&self) -> NodeRef {
        self.dht.me().clone()
    }

    /// Retrieves the ring state of current node.
    pub fn dht(&self) -> Arc<PeerRing> {
        self.dht.clone()
    }

    /// The identifier space of the ring.
    pub fn space(&self) -> IdSpace {
        self.dht.space()
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> Result<NodeState> {
        self.dht.state()
    }

    /// Register the callback receiving what is resolved locally.
    pub fn set_callback(&self, callback: SharedNodeCallback) -> Result<()> {
        self.message_handler.set_callback(Some(callback))
    }

    /// Join the ring through `bootstrap`, or start a new ring when there is none.
    pub async fn join(&self, bootstrap: Option<Bootstrap>) -> Result<()> {
        match bootstrap {
            None => self.dht.init_seed(),
            Some(bootstrap) => {
                let act = self.dht.join(bootstrap)?;
                let events = self.message_handler.dht_events(&act);
                self.handle_message_handler_events(&events).await
            }
        }
    }

    /// Start the periodic stabilization task.
    pub fn start_update_fingers(self: &Arc<Self>) -> Result<()> {
        let mut stabilizer = self
            .stabilizer
            .lock()
            .map_err(|_| Error::StabilizerSyncLockError)?;
        if stabilizer.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return Err(Error::StabilizerAlreadyRunning(self.id()));
        }
        tracing::info!(
            "{} start stabilization every {:?}",
            self.id(),
            self.stabilize_interval
        );
        *stabilizer = Some(Stabilizer::new(self, self.stabilize_interval).spawn());
        Ok(())
    }

    /// Stop the periodic stabilization task. Stopping twice is not an error.
    pub fn stop_update_fingers(&self) -> Result<()> {
        let mut stabilizer = self
            .stabilizer
            .lock()
            .map_err(|_| Error::StabilizerSyncLockError)?;
        if let Some(handle) = stabilizer.take() {
            tracing::info!("{} stop stabilization", self.id());
            handle.stop();
        }
        Ok(())
    }

    /// Whether the periodic stabilization task is running.
    pub fn is_updating_fingers(&self) -> bool {
        self.stabilizer
            .lock()
            .map(|s| s.as_ref().map(|h| !h.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Run stabilization once: stabilize, notify, then refresh one finger.
    pub async fn tick(&self) -> Result<()> {
        tracing::debug!("STABILIZATION stabilize start");
        match self.dht.pre_stabilize() {
            Ok(act) => {
                let events = self.message_handler.dht_events(&act);
                if let Err(e) = self.handle_message_handler_events(&events).await {
                    tracing::error!("[stabilize] Failed on stabilize {:?}", e);
                }
            }
            Err(e) => tracing::error!("[stabilize] Failed on stabilize {:?}", e),
        }
        tracing::debug!("STABILIZATION stabilize end");
        tracing::debug!("STABILIZATION fix_fingers start");
        let act = self.dht.fix_fingers()?;
        let events = self.message_handler.dht_events(&act);
        self.handle_message_handler_events(&events).await?;
        tracing::debug!("STABILIZATION fix_fingers end");
        Ok(())
    }

    /// Handle an inbound envelope addressed to current node.
    /// Transport failures of the resulting sends are logged, not returned.
    #[async_recursion]
    pub async fn dispatch(&self, envelope: Envelope) -> Result<()> {
        let events = self.message_handler.handle_message(&envelope).await?;
        self.handle_message_handler_events(&events).await
    }

    /// Hash `key` into the ring.
    pub fn hash_key(&self, key: &str) -> NodeId {
        self.space().hash(self.hasher.as_ref(), key.as_bytes())
    }

    /// Resolve the owner of `key` from local state only.
    pub fn lookup(&self, key: &str) -> Result<NodeRef> {
        self.lookup_id(self.hash_key(key))
    }

    /// Resolve the owner of `id` from local state only.
    pub fn lookup_id(&self, id: NodeId) -> Result<NodeRef> {
        self.dht.lookup(id)
    }

    /// Send application content to `to`. Delivered verbatim to its callback.
    pub async fn send_message(&self, to: &NodeRef, content: Value) -> Result<()> {
        let msg = Message::CustomMessage(CustomMessage { id: to.id, content });
        self.handle_message_handler_events(&vec![MessageHandlerEvent::SendMessage(
            msg,
            to.clone(),
        )])
        .await
    }

    /// Route a keyed operation toward the owner of its hashed key, starting here.
    pub async fn send_keyed(&self, operation: KeyedOperation) -> Result<()> {
        let id = self.hash_key(operation.key());
        let msg = Message::KeyedOperationSend(KeyedOperationSend { id, operation });
        let me = self.node_ref();
        self.dispatch(Envelope::new(msg, me.clone(), Some(me)))
            .await
    }

    /// A serializable snapshot of the routing state.
    pub fn inspect(&self) -> Result<DHTInspect> {
        DHTInspect::inspect(&self.dht)
    }

    async fn deliver(&self, to: &NodeRef, envelope: Envelope) -> Result<()> {
        if to.id == self.id() {
            return self.dispatch(envelope).await;
        }
        if let Err(e) = self.transport.send_to(to, &envelope).await {
            tracing::warn!("{} failed to send to {}: {}", self.id(), to, e);
        }
        Ok(())
    }

    /// Carry out one event produced by the message handler.
    pub async fn handle_message_handler_event(&self, event: &MessageHandlerEvent) -> Result<()> {
        tracing::debug!("Handle message handler event: {:?}", event);
        match event {
            MessageHandlerEvent::SendMessage(msg, to) => {
                let envelope = Envelope::new(msg.clone(), self.node_ref(), Some(to.clone()));
                self.deliver(to, envelope).await
            }
            MessageHandlerEvent::SendToBootstrap(msg, bootstrap) => {
                let to = bootstrap.node_ref();
                let envelope = Envelope::new(msg.clone(), self.node_ref(), to.clone());
                match to {
                    Some(to) => self.deliver(&to, envelope).await,
                    None => {
                        if let Err(e) = self
                            .transport
                            .send_payload(&bootstrap.address, bootstrap.port, &envelope)
                            .await
                        {
                            tracing::warn!(
                                "{} failed to reach bootstrap {}: {}",
                                self.id(),
                                bootstrap,
                                e
                            );
                        }
                        Ok(())
                    }
                }
            }
            MessageHandlerEvent::SendReportMessage(ctx, msg) => {
                let envelope = Envelope::new(msg.clone(), self.node_ref(), Some(ctx.from.clone()));
                self.deliver(&ctx.from, envelope).await
            }
            MessageHandlerEvent::ForwardPayload(ctx, next) => {
                if next.id == self.id() {
                    return Err(Error::ForwardToSelf(ctx.message.id()));
                }
                self.deliver(next, ctx.forward_to(next)).await
            }
        }
    }

    /// Batch handle events, in order.
    pub async fn handle_message_handler_events(&self, events: &Vec<MessageHandlerEvent>) -> Result<()> {
        for event in events {
            if let Err(e) = self.handle_message_handler_event(event).await {
                tracing::error!("{} failed to handle event {:?}: {}", self.id(), event, e);
            }
        }
        Ok(())
    }
}

impl Drop for ChordNode {
    fn drop(&mut self) {
        if let Ok(mut stabilizer) = self.stabilizer.lock() {
            if let Some(handle) = stabilizer.take() {
                handle.stop();
            }
        }
    }
}
