#![warn(missing_docs)]
//! This module provider [ChordNodeBuilder] and it's interface for
//! [ChordNode]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crate::consts::DEFAULT_IDENTIFIER_BITS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::dht::IdSpace;
use crate::dht::KeyHasher;
use crate::dht::NodeId;
use crate::dht::NodeRef;
use crate::dht::PeerRing;
use crate::dht::Sha1Hasher;
use crate::error::Error;
use crate::error::Result;
use crate::message::MessageHandler;
use crate::message::PayloadSender;
use crate::swarm::callback::SharedNodeCallback;
use crate::swarm::ChordNode;

/// Creates a ChordNodeBuilder to configure a ChordNode.
pub struct ChordNodeBuilder {
    address: String,
    port: u16,
    transport: Arc<dyn PayloadSender>,
    identifier_bits: u8,
    id: Option<NodeId>,
    seed: Option<String>,
    hasher: Arc<dyn KeyHasher>,
    callback: Option<SharedNodeCallback>,
    stabilize_interval: Duration,
}

impl ChordNodeBuilder {
    /// Creates new instance of [ChordNodeBuilder] for a member reachable at
    /// `address:port`, sending through `transport`.
    pub fn new(address: impl Into<String>, port: u16, transport: Arc<dyn PayloadSender>) -> Self {
        Self {
            address: address.into(),
            port,
            transport,
            identifier_bits: DEFAULT_IDENTIFIER_BITS,
            id: None,
            seed: None,
            hasher: Arc::new(Sha1Hasher),
            callback: None,
            stabilize_interval: Duration::from_millis(DEFAULT_STABILIZE_INTERVAL_MS),
        }
    }

    /// Sets up the width `m` of the identifier space.
    pub fn identifier_bits(mut self, bits: u8) -> Self {
        self.identifier_bits = bits;
        self
    }

    /// Use a fixed identifier instead of minting one.
    pub fn id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Mint the identifier by hashing `seed` instead of a random uuid.
    pub fn seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    /// Replace the SHA-1 key hasher.
    pub fn hasher(mut self, hasher: Arc<dyn KeyHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Bind callback for what the node resolves locally.
    pub fn callback(mut self, callback: SharedNodeCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Period of the stabilization task.
    pub fn stabilize_interval(mut self, interval: Duration) -> Self {
        self.stabilize_interval = interval;
        self
    }

    /// Try build for `ChordNode`.
    pub fn build(self) -> Result<ChordNode> {
        let space = IdSpace::new(self.identifier_bits)?;
        if self.stabilize_interval.is_zero() {
            return Err(Error::InvalidStabilizeInterval);
        }
        let id = match self.id {
            Some(id) if !space.contains(id) => {
                return Err(Error::NodeIdOutOfSpace(id, space.bits()));
            }
            Some(id) => id,
            None => {
                let seed = self
                    .seed
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                space.hash(self.hasher.as_ref(), seed.as_bytes())
            }
        };

        let me = NodeRef::new(id, self.address, self.port);
        let dht = Arc::new(PeerRing::new(space, me));
        let message_handler = MessageHandler::new(dht.clone(), self.callback);

        Ok(ChordNode {
            dht,
            message_handler,
            transport: self.transport,
            hasher: self.hasher,
            stabilize_interval: self.stabilize_interval,
            stabilizer: Mutex::new(None),
        })
    }
}
