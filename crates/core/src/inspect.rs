//! Inspect the routing state of a ring member.
use serde::Deserialize;
use serde::Serialize;

use crate::dht::NodeState;
use crate::dht::PeerRing;
use crate::error::Result;

/// Serializable snapshot of one member's routing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DHTInspect {
    /// Hex id of the member.
    pub id: String,
    /// Lifecycle phase.
    pub state: NodeState,
    /// Current successor, as `id@address:port`.
    pub successor: String,
    /// Current predecessor, as `id@address:port`.
    #[serde(default)]
    pub predecessor: Option<String>,
    /// Runs of equal finger nodes as `(node, first index, last index)`.
    pub finger_table: Vec<(String, usize, usize)>,
}

impl DHTInspect {
    /// Take a snapshot of `dht`.
    pub fn inspect(dht: &PeerRing) -> Result<Self> {
        let fingers = dht.fingers()?;
        Ok(Self {
            id: dht.id.to_string(),
            state: dht.state()?,
            successor: dht.successor()?.to_string(),
            predecessor: dht.predecessor()?.map(|p| p.to_string()),
            finger_table: compress_iter(fingers.list().iter().map(|f| f.node.to_string())),
        })
    }
}

fn compress_iter<T>(iter: impl Iterator<Item = T>) -> Vec<(T, usize, usize)>
where T: PartialEq {
    let mut runs: Vec<(T, usize, usize)> = vec![];
    for (i, x) in iter.enumerate() {
        match runs.last_mut() {
            Some((prev, _, end)) if *prev == x => *end = i,
            _ => runs.push((x, i, i)),
        }
    }
    runs
}
