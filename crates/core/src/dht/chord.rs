//! Chord algorithm implement.
#![warn(missing_docs)]
use std::sync::Mutex;
use std::sync::MutexGuard;

use super::Bootstrap;
use super::FingerTable;
use super::IdSpace;
use super::NodeId;
use super::NodeRef;
use super::NodeState;
use crate::error::Error;
use crate::error::Result;

/// PeerRing is used to help a node interact with other nodes.
/// All nodes form a clockwise ring in the order of [NodeId].
/// This struct takes its name from that.
///
/// PeerRing never touches the network. Every method that needs a remote peer
/// returns a [PeerRingAction] which the message handler carries out.
pub struct PeerRing {
    /// The id of current node.
    pub id: NodeId,
    me: NodeRef,
    space: IdSpace,
    state: Mutex<RingState>,
}

/// Routing state guarded as one unit, so that successor, predecessor and fingers
/// are always observed consistently with each other.
#[derive(Debug)]
struct RingState {
    phase: NodeState,
    predecessor: Option<NodeRef>,
    /// Entry 0 is the successor pointer.
    finger: FingerTable,
    bootstrap: Option<Bootstrap>,
}

/// `PeerRing` use this to describe the result of Chord algorithm. Sometimes it's a
/// direct result, sometimes it's an action that is continued externally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerRingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// Found the node responsible for the queried id.
    Some(NodeRef),
    /// Trigger a remote action on the given node.
    RemoteAction(NodeRef, RemoteAction),
    /// Ask the bootstrap node to resolve the successor of current node.
    Join(Bootstrap),
    /// Trigger multiple remote actions, in order.
    MultiActions(Vec<PeerRingAction>),
}

/// Some of the process needs to be done remotely. This enum is used to describe that.
/// The reply of the remote node is fed back into [PeerRing] by the message handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    /// Ask the node to keep resolving the successor of an id.
    FindSuccessor(NodeId),
    /// Ask the node to resolve the successor of a finger start, then report back
    /// with the finger index.
    FindSuccessorForFix(NodeId, u8),
    /// Tell the node we believe we are its predecessor.
    Notify,
    /// Ask the node for its current predecessor.
    QueryPredecessor,
}

impl PeerRingAction {
    /// Returns `true` if the action is a [PeerRingAction::None] value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if the action is a [PeerRingAction::Some] value.
    pub fn is_some(&self) -> bool {
        matches!(self, Self::Some(_))
    }

    /// Returns `true` if the action is a [PeerRingAction::RemoteAction] value.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteAction(..))
    }
}

impl From<Vec<PeerRingAction>> for PeerRingAction {
    fn from(acts: Vec<PeerRingAction>) -> Self {
        let acts: Vec<_> = acts.into_iter().filter(|a| !a.is_none()).collect();
        if !acts.is_empty() {
            Self::MultiActions(acts)
        } else {
            Self::None
        }
    }
}

impl RingState {
    fn me(&self) -> &NodeRef {
        self.finger.owner()
    }

    fn space(&self) -> IdSpace {
        self.finger.space()
    }

    fn successor(&self) -> &NodeRef {
        self.finger.successor()
    }

    /// Ownership interval is `(predecessor, self]`. With no predecessor the node
    /// only claims the whole ring while it is alone.
    fn owns(&self, id: NodeId) -> bool {
        let me = self.me().id;
        if id == me {
            return true;
        }
        match &self.predecessor {
            Some(p) => self.space().between(id, p.id, me),
            None => self.successor().id == me,
        }
    }

    fn find_successor(&self, id: NodeId) -> PeerRingAction {
        // a joining member knows nothing worth answering with yet
        if self.phase == NodeState::Joining && self.bootstrap.is_some() {
            return PeerRingAction::None;
        }
        if self.owns(id) {
            return PeerRingAction::Some(self.me().clone());
        }
        let me = self.me();
        let succ = self.successor();
        if self.predecessor.is_none() {
            // owns nothing but its own id until notified, so keys it will own go round again
            tracing::debug!("{} has no predecessor yet, forwarding {}", me.id, id);
        }
        if self.space().between(id, me.id, succ.id) {
            return PeerRingAction::Some(succ.clone());
        }
        let next = self.finger.closest_preceding_finger(id);
        let next = if next.id == me.id { succ } else { next };
        PeerRingAction::RemoteAction(next.clone(), RemoteAction::FindSuccessor(id))
    }

    fn stabilize_with(&mut self, predecessor_of_successor: Option<NodeRef>) -> PeerRingAction {
        let Some(p) = predecessor_of_successor else {
            return PeerRingAction::None;
        };
        let me = self.me().id;
        let succ = self.successor().id;
        if !self.space().strictly_between(p.id, me, succ) {
            return PeerRingAction::None;
        }
        tracing::debug!("{} adopt successor {} in place of {}", me, p, succ);
        self.finger.set_successor(p.clone());
        self.finger.join(&p);
        PeerRingAction::RemoteAction(p, RemoteAction::Notify)
    }

    fn lookup(&self, id: NodeId) -> NodeRef {
        let me = self.me();
        if self.owns(id) {
            return me.clone();
        }
        let succ = self.successor();
        if self.space().between(id, me.id, succ.id) {
            return succ.clone();
        }
        // first known node at or after id
        let space = self.space();
        self.finger
            .list()
            .iter()
            .map(|f| &f.node)
            .chain(self.predecessor.iter())
            .fold(me, |best, n| {
                if space.distance(id, n.id) < space.distance(id, best.id) {
                    n
                } else {
                    best
                }
            })
            .clone()
    }
}

impl PeerRing {
    /// Create a [PeerRing] for `me`. It starts [NodeState::Joining] with every
    /// finger, successor included, pointing at itself.
    pub fn new(space: IdSpace, me: NodeRef) -> Self {
        Self {
            id: me.id,
            state: Mutex::new(RingState {
                phase: NodeState::Joining,
                predecessor: None,
                finger: FingerTable::new(space, me.clone()),
                bootstrap: None,
            }),
            space,
            me,
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<RingState>> {
        self.state.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// The descriptor of current node.
    pub fn me(&self) -> &NodeRef {
        &self.me
    }

    /// The identifier space of the ring.
    pub fn space(&self) -> IdSpace {
        self.space
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> Result<NodeState> {
        Ok(self.lock_state()?.phase)
    }

    /// Current successor, which is finger 0.
    pub fn successor(&self) -> Result<NodeRef> {
        Ok(self.lock_state()?.successor().clone())
    }

    /// Current predecessor.
    pub fn predecessor(&self) -> Result<Option<NodeRef>> {
        Ok(self.lock_state()?.predecessor.clone())
    }

    /// The node asked to resolve our successor while joining.
    pub fn bootstrap(&self) -> Result<Option<Bootstrap>> {
        Ok(self.lock_state()?.bootstrap.clone())
    }

    /// A snapshot of the finger table.
    pub fn fingers(&self) -> Result<FingerTable> {
        Ok(self.lock_state()?.finger.clone())
    }

    /// Become the first node of a new ring: successor is self, no predecessor.
    pub fn init_seed(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        state.phase = NodeState::Stable;
        state.bootstrap = None;
        state.predecessor = None;
        state.finger.set_successor(self.me.clone());
        tracing::info!("{} start a new ring", self.id);
        Ok(())
    }

    /// Join a ring containing `bootstrap`.
    ///
    /// Joining through ourselves is the same as [PeerRing::init_seed]. Otherwise the
    /// node stays [NodeState::Joining] and this returns a [PeerRingAction::Join]
    /// for the caller to send.
    pub fn join(&self, bootstrap: Bootstrap) -> Result<PeerRingAction> {
        if bootstrap.id == Some(self.id) {
            self.init_seed()?;
            return Ok(PeerRingAction::None);
        }
        let mut state = self.lock_state()?;
        state.phase = NodeState::Joining;
        state.predecessor = None;
        state.bootstrap = Some(bootstrap.clone());
        tracing::info!("{} join ring via {}", self.id, bootstrap);
        Ok(PeerRingAction::Join(bootstrap))
    }

    /// Handle the successor reported for our join request.
    /// Only the first report while [NodeState::Joining] is taken; later ones are ignored.
    pub fn on_join_reply(&self, successor: NodeRef) -> Result<bool> {
        let mut state = self.lock_state()?;
        if state.phase != NodeState::Joining {
            tracing::debug!("{} ignore late join reply {}", self.id, successor);
            return Ok(false);
        }
        state.finger.set_successor(successor.clone());
        state.finger.join(&successor);
        state.phase = NodeState::Stable;
        tracing::info!("{} joined with successor {}", self.id, successor);
        Ok(true)
    }

    /// Whether `id` falls in `(predecessor, self]`.
    pub fn owns(&self, id: NodeId) -> Result<bool> {
        Ok(self.lock_state()?.owns(id))
    }

    /// Find the successor of an id.
    /// Returns [PeerRingAction::Some] when it is known locally, or a
    /// [RemoteAction::FindSuccessor] naming the next hop otherwise.
    /// A member still joining returns [PeerRingAction::None]; the asker retries.
    pub fn find_successor(&self, id: NodeId) -> Result<PeerRingAction> {
        let act = self.lock_state()?.find_successor(id);
        tracing::debug!("find_successor: self: {}, id: {}, result: {:?}", self.id, id, act);
        Ok(act)
    }

    /// The closest node preceding `id` known to the finger table, or self.
    pub fn closest_preceding_finger(&self, id: NodeId) -> Result<NodeRef> {
        Ok(self
            .lock_state()?
            .finger
            .closest_preceding_finger(id)
            .clone())
    }

    /// Resolve the owner of `id` from local state only: self when owned, the
    /// successor when `id` falls in `(self, successor]`, otherwise the first known
    /// node at or after `id`. Never sends a message.
    pub fn lookup(&self, id: NodeId) -> Result<NodeRef> {
        Ok(self.lock_state()?.lookup(id))
    }

    /// Handle notification from a node that thinks it is our predecessor.
    /// It is taken when we have none, or when it lies strictly between the current
    /// predecessor and self. Returns whether the predecessor changed.
    pub fn notify(&self, candidate: NodeRef) -> Result<bool> {
        if candidate.id == self.id {
            return Ok(false);
        }
        let mut state = self.lock_state()?;
        state.finger.join(&candidate);
        let adopt = match &state.predecessor {
            None => true,
            Some(p) => self.space.strictly_between(candidate.id, p.id, self.id),
        };
        if adopt {
            tracing::debug!("{} set predecessor {}", self.id, candidate);
            state.predecessor = Some(candidate);
        }
        Ok(adopt)
    }

    /// Handle the predecessor reported by `reporter`.
    /// Reports from anyone but the current successor are dropped.
    pub fn stabilize(
        &self,
        reporter: NodeId,
        predecessor_of_successor: Option<NodeRef>,
    ) -> Result<PeerRingAction> {
        let mut state = self.lock_state()?;
        if state.phase != NodeState::Stable {
            return Ok(PeerRingAction::None);
        }
        if state.successor().id != reporter {
            tracing::debug!(
                "{} drop predecessor report from {}, successor is {}",
                self.id,
                reporter,
                state.successor().id
            );
            return Ok(PeerRingAction::None);
        }
        Ok(state.stabilize_with(predecessor_of_successor))
    }

    /// The ring-management part of one stabilization tick.
    ///
    /// While joining, the join request is sent to the bootstrap node again.
    /// When the successor is self, its predecessor is read directly. Otherwise the
    /// successor is asked for its predecessor and notified.
    pub fn pre_stabilize(&self) -> Result<PeerRingAction> {
        let mut state = self.lock_state()?;
        if state.phase == NodeState::Joining {
            return Ok(match &state.bootstrap {
                Some(b) => PeerRingAction::Join(b.clone()),
                None => PeerRingAction::None,
            });
        }
        let succ = state.successor().clone();
        if succ.id == self.id {
            let predecessor = state.predecessor.clone();
            return Ok(state.stabilize_with(predecessor));
        }
        Ok(PeerRingAction::MultiActions(vec![
            PeerRingAction::RemoteAction(succ.clone(), RemoteAction::QueryPredecessor),
            PeerRingAction::RemoteAction(succ, RemoteAction::Notify),
        ]))
    }

    /// Refresh the next finger in round-robin order over `1..m`.
    /// Finger 0 is the successor and is kept by [PeerRing::pre_stabilize] instead.
    pub fn fix_fingers(&self) -> Result<PeerRingAction> {
        let mut state = self.lock_state()?;
        if state.phase != NodeState::Stable {
            return Ok(PeerRingAction::None);
        }
        let Some(index) = state.finger.next_fix_index() else {
            return Ok(PeerRingAction::None);
        };
        let Some(start) = state.finger.start(index) else {
            return Ok(PeerRingAction::None);
        };
        match state.find_successor(start) {
            PeerRingAction::Some(node) => {
                state.finger.set(index, node);
                Ok(PeerRingAction::None)
            }
            PeerRingAction::RemoteAction(next, RemoteAction::FindSuccessor(id)) => {
                Ok(PeerRingAction::RemoteAction(
                    next,
                    RemoteAction::FindSuccessorForFix(id, index as u8),
                ))
            }
            act => Ok(act),
        }
    }

    /// Handle the successor reported for finger `index`.
    pub fn on_finger_found(&self, index: u8, node: NodeRef) -> Result<bool> {
        Ok(self.lock_state()?.finger.set(index as usize, node))
    }
}
