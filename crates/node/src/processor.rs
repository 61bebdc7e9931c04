#![warn(missing_docs)]

//! Processor of chord-node: the ring members hosted by this process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::prelude::chord_core::dht::IdSpace;
use crate::prelude::chord_core::swarm::callback::CallbackError;
use crate::prelude::chord_transport::connections::WsConnector;
use crate::prelude::Bootstrap;
use crate::prelude::ChordNode;
use crate::prelude::ChordNodeBuilder;
use crate::prelude::DHTInspect;
use crate::prelude::Envelope;
use crate::prelude::KeyedOperation;
use crate::prelude::NodeCallback;
use crate::prelude::NodeId;
use crate::prelude::NodeRef;
use crate::prelude::PayloadSender;
use crate::prelude::RingDirectory;
use crate::prelude::SharedNodeCallback;
use crate::prelude::SwarmTransport;

/// ProcessorBuilder is used to initialize a [Processor] instance.
/// There is a `from_config` method used to initialize the Builder with a [Config].
pub struct ProcessorBuilder {
    config: Config,
    transport: Option<Arc<dyn PayloadSender>>,
    callback: Option<SharedNodeCallback>,
}

/// Processor for chord-node, owns every member listening on one endpoint.
#[derive(Clone)]
pub struct Processor {
    /// Demultiplexer of inbound frames.
    pub directory: Arc<RingDirectory>,
    nodes: Vec<Arc<ChordNode>>,
    join: Option<Bootstrap>,
    bind_addr: String,
}

impl ProcessorBuilder {
    /// initialize a [ProcessorBuilder] with a [Config].
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            transport: None,
            callback: None,
        })
    }

    /// initialize a [ProcessorBuilder] with a yaml [Config].
    pub fn from_serialized(config: &str) -> Result<Self> {
        let config = serde_yaml::from_str::<Config>(config).map_err(Error::SerdeYamlError)?;
        Self::from_config(&config)
    }

    /// Send through `transport` instead of websockets.
    pub fn transport(mut self, transport: Arc<dyn PayloadSender>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the callback of every hosted member.
    pub fn callback(mut self, callback: SharedNodeCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Build the [Processor]. Members are created and registered but not joined.
    pub fn build(self) -> Result<Processor> {
        let config = self.config;
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(SwarmTransport::new(WsConnector).scheme(config.scheme.clone()))
        });
        let callback = self
            .callback
            .unwrap_or_else(|| LoggingCallback.shared());
        let space = IdSpace::new(config.identifier_bits)?;

        let directory = Arc::new(RingDirectory::new());
        let mut nodes = vec![];
        for id in member_ids(&space, config.node_id, config.virtual_nodes) {
            let mut builder = ChordNodeBuilder::new(
                config.external_address.clone(),
                config.external_port,
                transport.clone(),
            )
            .identifier_bits(config.identifier_bits)
            .stabilize_interval(Duration::from_millis(config.stabilize_interval))
            .callback(callback.clone());
            if let Some(id) = id {
                builder = builder.id(id);
            }
            let node = Arc::new(builder.build()?);
            tracing::info!("Hosting member {}", node.node_ref());
            directory.register(node.clone())?;
            nodes.push(node);
        }

        Ok(Processor {
            directory,
            nodes,
            join: config.join,
            bind_addr: config.bind_addr,
        })
    }
}

/// Fixed ids spread evenly from `first` when it is given, minted ids otherwise.
fn member_ids(space: &IdSpace, first: Option<NodeId>, count: usize) -> Vec<Option<NodeId>> {
    match first {
        Some(first) => {
            let step = (space.mask() / count as u128).wrapping_add(1);
            (0..count as u128)
                .map(|i| Some(space.add(first, step.wrapping_mul(i))))
                .collect()
        }
        None => vec![None; count],
    }
}

impl Processor {
    /// The first hosted member, the one that seeds or joins through the bootstrap.
    pub fn node(&self) -> Arc<ChordNode> {
        self.nodes[0].clone()
    }

    /// All hosted members, first one first.
    pub fn nodes(&self) -> &[Arc<ChordNode>] {
        &self.nodes
    }

    /// Address the endpoint listens on.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Join the ring and run stabilization on every member.
    /// The first member seeds a ring or joins the configured bootstrap, the others
    /// join through the first one.
    pub async fn start(&self) -> Result<()> {
        let first = self.node();
        first.join(self.join.clone()).await?;
        let local = Bootstrap::from(&first.node_ref());
        for node in self.nodes.iter().skip(1) {
            node.join(Some(local.clone())).await?;
        }
        for node in self.nodes.iter() {
            node.start_update_fingers()?;
        }
        tracing::info!("Started {} member(s)", self.nodes.len());
        Ok(())
    }

    /// Stop the stabilization of every member.
    pub fn stop(&self) -> Result<()> {
        for node in self.nodes.iter() {
            node.stop_update_fingers()?;
        }
        Ok(())
    }

    /// Resolve the owner of `key` from the first member's view.
    pub fn lookup(&self, key: &str) -> Result<NodeRef> {
        Ok(self.node().lookup(key)?)
    }

    /// Send a keyed operation from the first member toward the owner of its key.
    /// Returns the owner as currently resolved by [Processor::lookup].
    pub async fn send_keyed(&self, operation: KeyedOperation) -> Result<NodeRef> {
        let owner = self.lookup(operation.key())?;
        tracing::info!("{:?} routed toward {}", operation, owner);
        self.node().send_keyed(operation).await?;
        Ok(owner)
    }

    /// Routing state of every member.
    pub fn inspect(&self) -> Result<Vec<DHTInspect>> {
        self.nodes
            .iter()
            .map(|node| node.inspect().map_err(Error::from))
            .collect()
    }
}

/// Callback of the binary: everything resolved locally is logged.
pub struct LoggingCallback;

#[async_trait]
impl NodeCallback for LoggingCallback {
    async fn on_message(&self, envelope: &Envelope) -> std::result::Result<(), CallbackError> {
        tracing::info!(
            "Message for {} from {}: {:?}",
            envelope.message.id(),
            envelope.from,
            envelope.message
        );
        Ok(())
    }

    async fn on_keyed_operation(
        &self,
        envelope: &Envelope,
        operation: &KeyedOperation,
    ) -> std::result::Result<(), CallbackError> {
        tracing::info!(
            "{} owns key {:?}, requested by {}: {:?}",
            envelope.message.id(),
            operation.key(),
            envelope.from,
            operation
        );
        Ok(())
    }
}
