//! Shared node descriptors of the ring.
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::NodeId;
use crate::error::Error;
use crate::error::Result;

/// A reachable ring member: its identifier plus the address it listens on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Position on the ring.
    pub id: NodeId,
    /// Host name or ip of the listening endpoint.
    pub address: String,
    /// Port of the listening endpoint.
    pub port: u16,
}

impl NodeRef {
    /// Create a new [NodeRef].
    pub fn new(id: NodeId, address: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            address: address.into(),
            port,
        }
    }

    /// `address:port`, the key outbound channels are cached under.
    /// Several virtual nodes may share one endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.id, self.address, self.port)
    }
}

/// The node a joining member asks for its successor.
/// Usually only the endpoint is known; the id is set when joining through a node
/// hosted in the same process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bootstrap {
    /// Host name or ip of the bootstrap endpoint.
    pub address: String,
    /// Port of the bootstrap endpoint.
    pub port: u16,
    /// Id of the bootstrap node, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
}

impl Bootstrap {
    /// A bootstrap known only by endpoint.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            id: None,
        }
    }

    /// The full descriptor, when the id is known.
    pub fn node_ref(&self) -> Option<NodeRef> {
        self.id
            .map(|id| NodeRef::new(id, self.address.clone(), self.port))
    }
}

impl From<&NodeRef> for Bootstrap {
    fn from(node: &NodeRef) -> Self {
        Self {
            address: node.address.clone(),
            port: node.port,
            id: Some(node.id),
        }
    }
}

impl std::fmt::Display for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}@{}:{}", id, self.address, self.port),
            None => write!(f, "{}:{}", self.address, self.port),
        }
    }
}

/// Parses the display form, `[id@]address:port`.
impl FromStr for Bootstrap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidBootstrap(s.to_string());
        let (id, endpoint) = match s.split_once('@') {
            Some((id, endpoint)) => (Some(NodeId::from_str(id)?), endpoint),
            None => (None, s),
        };
        let (address, port) = endpoint.rsplit_once(':').ok_or_else(invalid)?;
        if address.is_empty() {
            return Err(invalid());
        }
        let port = port.parse().map_err(|_| invalid())?;
        Ok(Self {
            address: address.to_string(),
            port,
            id,
        })
    }
}

/// Lifecycle of a ring member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Waiting for the bootstrap node to report a successor.
    Joining,
    /// Has a successor and takes part in stabilization.
    Stable,
}
