use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::dht::Bootstrap;
use crate::dht::KeyHasher;
use crate::dht::NodeId;
use crate::dht::Sha1Hasher;
use crate::directory::RingDirectory;
use crate::error::Error;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::KeyedOperation;
use crate::message::PayloadSender;
use crate::swarm::callback::CallbackError;
use crate::swarm::callback::NodeCallback;
use crate::swarm::ChordNode;
use crate::swarm::ChordNodeBuilder;

mod test_message_handler;
mod test_stabilization;

/// Frames delivered by one [TestRing::deliver_all] before it gives up.
const MAX_FRAMES: usize = 10_000;

/// A text frame as it would leave the process.
#[derive(Debug, Clone)]
pub struct Frame {
    pub address: String,
    pub port: u16,
    pub path_id: String,
    pub text: String,
}

/// [PayloadSender] queueing frames in memory.
pub struct MemoryTransport {
    outbox: mpsc::UnboundedSender<Frame>,
}

impl MemoryTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        (Self { outbox }, inbox)
    }
}

#[async_trait]
impl PayloadSender for MemoryTransport {
    async fn send_payload(&self, address: &str, port: u16, envelope: &Envelope) -> Result<()> {
        let endpoint = format!("{}:{}", address, port);
        let frame = Frame {
            address: address.to_string(),
            port,
            path_id: envelope.target_id().to_string(),
            text: envelope.to_json()?,
        };
        self.outbox.send(frame).map_err(|_| {
            Error::Transport(chord_transport::error::Error::ConnectionClosed(endpoint))
        })
    }
}

/// Keys written as decimal numbers land on that id, anything else is hashed.
pub struct NumericHasher;

impl KeyHasher for NumericHasher {
    fn digest(&self, key: &[u8]) -> u128 {
        std::str::from_utf8(key)
            .ok()
            .and_then(|k| k.parse().ok())
            .unwrap_or_else(|| Sha1Hasher.digest(key))
    }
}

/// Callback keeping everything it is handed.
#[derive(Default)]
pub struct Recorder {
    pub messages: Mutex<Vec<Envelope>>,
    pub operations: Mutex<Vec<(Envelope, KeyedOperation)>>,
}

#[async_trait]
impl NodeCallback for Recorder {
    async fn on_message(&self, envelope: &Envelope) -> std::result::Result<(), CallbackError> {
        self.messages.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    async fn on_keyed_operation(
        &self,
        envelope: &Envelope,
        operation: &KeyedOperation,
    ) -> std::result::Result<(), CallbackError> {
        self.operations
            .lock()
            .unwrap()
            .push((envelope.clone(), operation.clone()));
        Ok(())
    }
}

/// Several processes on `127.0.0.1`, one [RingDirectory] per port, wired
/// through one [MemoryTransport]. Frames only move on [TestRing::deliver_all].
pub struct TestRing {
    bits: u8,
    transport: Arc<MemoryTransport>,
    inbox: mpsc::UnboundedReceiver<Frame>,
    processes: HashMap<u16, Arc<RingDirectory>>,
}

impl TestRing {
    pub fn new(bits: u8) -> Self {
        let (transport, inbox) = MemoryTransport::new();
        Self {
            bits,
            transport: Arc::new(transport),
            inbox,
            processes: HashMap::new(),
        }
    }

    pub fn builder(&self, id: u128, port: u16) -> ChordNodeBuilder {
        ChordNodeBuilder::new("127.0.0.1", port, self.transport.clone())
            .identifier_bits(self.bits)
            .id(NodeId(id))
            .hasher(Arc::new(NumericHasher))
    }

    /// Host a node with `id` in the process listening on `port`.
    pub fn add_node(&mut self, id: u128, port: u16) -> Arc<ChordNode> {
        let node = Arc::new(self.builder(id, port).build().unwrap());
        self.process(port).register(node.clone()).unwrap();
        node
    }

    pub fn process(&mut self, port: u16) -> Arc<RingDirectory> {
        self.processes.entry(port).or_default().clone()
    }

    pub fn bootstrap(port: u16) -> Bootstrap {
        Bootstrap::new("127.0.0.1", port)
    }

    pub fn node(&self, id: u128) -> Arc<ChordNode> {
        self.processes
            .values()
            .find_map(|dir| dir.get(NodeId(id)))
            .unwrap()
    }

    /// All nodes, in ring order.
    pub fn nodes(&self) -> Vec<Arc<ChordNode>> {
        let mut nodes: Vec<_> = self.processes.values().flat_map(|d| d.nodes()).collect();
        nodes.sort_by_key(|n| n.id());
        nodes
    }

    /// Take the queued frames without delivering them.
    pub fn take_pending(&mut self) -> Vec<Frame> {
        let mut frames = vec![];
        while let Ok(frame) = self.inbox.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Deliver queued frames, and the frames they cause, until none is left.
    pub async fn deliver_all(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(frame) = self.inbox.try_recv() {
            delivered += 1;
            assert!(delivered < MAX_FRAMES, "frames keep coming");
            let Some(dir) = self.processes.get(&frame.port).cloned() else {
                tracing::warn!("nothing listens on {}:{}", frame.address, frame.port);
                continue;
            };
            if let Err(e) = dir.deliver(Some(&frame.path_id), &frame.text).await {
                tracing::warn!("drop frame {}: {}", frame.text, e);
            }
        }
        delivered
    }

    /// One stabilization round: every node ticks once, in ring order.
    pub async fn tick_all(&mut self) {
        for node in self.nodes() {
            node.tick().await.unwrap();
            self.deliver_all().await;
        }
    }

    pub async fn stabilize(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.tick_all().await;
        }
    }

    /// Successor and predecessor pointers form one cycle over all nodes.
    pub fn assert_converged(&self) {
        let nodes = self.nodes();
        let n = nodes.len();
        for (i, node) in nodes.iter().enumerate() {
            let succ = &nodes[(i + 1) % n];
            let pred = &nodes[(i + n - 1) % n];
            assert_eq!(
                node.dht().successor().unwrap().id,
                succ.id(),
                "successor of {}",
                node.id()
            );
            assert_eq!(
                node.dht().predecessor().unwrap().map(|p| p.id),
                Some(pred.id()),
                "predecessor of {}",
                node.id()
            );
        }
    }

    /// Seed a ring with the first id and join the rest through it, each node
    /// in its own process.
    pub async fn ring_of(bits: u8, ids: &[u128]) -> Self {
        let mut ring = Self::new(bits);
        let seed_port = 8000;
        for (i, id) in ids.iter().enumerate() {
            let node = ring.add_node(*id, seed_port + i as u16);
            if i == 0 {
                node.join(None).await.unwrap();
            } else {
                node.join(Some(Self::bootstrap(seed_port))).await.unwrap();
            }
            ring.deliver_all().await;
        }
        ring
    }
}
