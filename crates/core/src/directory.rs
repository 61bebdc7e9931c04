//! Registry of the ring members hosted by one process, and inbound demultiplexing.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;

use dashmap::DashMap;

use crate::dht::NodeId;
use crate::error::Error;
use crate::error::Result;
use crate::message::Envelope;
use crate::swarm::ChordNode;

/// All [ChordNode]s of a process, by id.
#[derive(Default)]
pub struct RingDirectory {
    nodes: DashMap<NodeId, Arc<ChordNode>>,
    last: RwLock<Option<NodeId>>,
}

impl RingDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node`. An id may only be registered once.
    pub fn register(&self, node: Arc<ChordNode>) -> Result<()> {
        let id = node.id();
        match self.nodes.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::NodeAlreadyRegistered(id));
            }
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(node);
            }
        }
        *self
            .last
            .write()
            .map_err(|_| Error::DirectorySyncLockError)? = Some(id);
        tracing::debug!("register node {}", id);
        Ok(())
    }

    /// Get a registered node.
    pub fn get(&self, id: NodeId) -> Option<Arc<ChordNode>> {
        self.nodes.get(&id).map(|n| n.value().clone())
    }

    /// Unregister a node and stop its stabilization.
    pub fn remove(&self, id: NodeId) -> Result<Arc<ChordNode>> {
        let (_, node) = self
            .nodes
            .remove(&id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        node.stop_update_fingers()?;
        let mut last = self
            .last
            .write()
            .map_err(|_| Error::DirectorySyncLockError)?;
        if *last == Some(id) {
            *last = None;
        }
        Ok(node)
    }

    /// Ids of all registered nodes, in ring order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.iter().map(|kv| *kv.key()).collect();
        ids.sort();
        ids
    }

    /// All registered nodes, in ring order.
    pub fn nodes(&self) -> Vec<Arc<ChordNode>> {
        self.ids().into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pick the node an inbound envelope is for.
    ///
    /// Tried in order: the `to` of the envelope, the id taken from the inbound
    /// path, then the most recently registered node. The last one is how a
    /// bootstrap endpoint answers joiners who do not know its id.
    pub fn resolve(&self, envelope: &Envelope, path_id: Option<NodeId>) -> Result<Arc<ChordNode>> {
        if let Some(node) = envelope.to.as_ref().and_then(|to| self.get(to.id)) {
            return Ok(node);
        }
        if let Some(node) = path_id.and_then(|id| self.get(id)) {
            return Ok(node);
        }
        let last = *self
            .last
            .read()
            .map_err(|_| Error::DirectorySyncLockError)?;
        last.and_then(|id| self.get(id)).ok_or_else(|| {
            Error::NodeNotFound(
                envelope
                    .to
                    .as_ref()
                    .map(|to| to.id)
                    .or(path_id)
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            )
        })
    }

    /// Parse an inbound text frame and dispatch it to its node.
    /// `path_id` is the hex id segment of the inbound route, if any.
    pub async fn deliver(&self, path_id: Option<&str>, text: &str) -> Result<()> {
        let envelope = Envelope::from_json(text)?;
        let path_id = match path_id {
            Some(raw) => match NodeId::from_str(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::debug!("ignore invalid path id {:?}: {}", raw, e);
                    None
                }
            },
            None => None,
        };
        let node = self.resolve(&envelope, path_id)?;
        node.dispatch(envelope).await
    }
}
