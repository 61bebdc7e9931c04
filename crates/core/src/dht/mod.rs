#![warn(missing_docs)]
//! Implementation of the ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

mod chord;
pub mod did;
/// Finger table of a ring member
pub mod finger;
mod stabilization;
pub mod types;

pub use chord::PeerRing;
pub use chord::PeerRingAction;
pub use chord::RemoteAction as PeerRingRemoteAction;
pub use did::IdSpace;
pub use did::KeyHasher;
pub use did::NodeId;
pub use did::Sha1Hasher;
pub use finger::Finger;
pub use finger::FingerTable;
pub use stabilization::Stabilizer;
pub use stabilization::StabilizerHandle;
pub use types::Bootstrap;
pub use types::NodeRef;
pub use types::NodeState;
