#![warn(missing_docs)]
use std::ops::Index;

use serde::Deserialize;
use serde::Serialize;

use super::IdSpace;
use super::NodeId;
use super::NodeRef;

/// One row of the [FingerTable].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finger {
    /// `(owner + 2^i) mod 2^m`, fixed at creation.
    pub start: NodeId,
    /// Best known node at or after `start`. May be stale.
    pub node: NodeRef,
}

/// Finger table of Chord DHT.
/// Holds exactly `m` entries; entry 0 is the successor of the owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerTable {
    space: IdSpace,
    owner: NodeRef,
    finger: Vec<Finger>,
    pub(super) fix_finger_index: u8,
}

impl FingerTable {
    /// Build a table where every entry points back at `owner`.
    pub fn new(space: IdSpace, owner: NodeRef) -> Self {
        let finger = (0..space.bits())
            .map(|i| Finger {
                start: space.finger_start(owner.id, i),
                node: owner.clone(),
            })
            .collect();
        Self {
            space,
            owner,
            finger,
            fix_finger_index: 0,
        }
    }

    /// The node this table belongs to.
    pub fn owner(&self) -> &NodeRef {
        &self.owner
    }

    /// The identifier space the table is laid out in.
    pub fn space(&self) -> IdSpace {
        self.space
    }

    /// Number of entries, always `m`.
    pub fn len(&self) -> usize {
        self.finger.len()
    }

    /// A table is never empty; `m >= 1`.
    pub fn is_empty(&self) -> bool {
        self.finger.is_empty()
    }

    /// Entry 0.
    pub fn successor(&self) -> &NodeRef {
        &self.finger[0].node
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<&Finger> {
        self.finger.get(index)
    }

    /// Start of entry `index`.
    pub fn start(&self, index: usize) -> Option<NodeId> {
        self.finger.get(index).map(|f| f.start)
    }

    /// setter
    ///
    /// Rejected when `index` is out of range, or when `node` sits strictly between the
    /// owner and the entry start, since such a node can never be the successor of it.
    /// Returns whether the entry was written.
    pub fn set(&mut self, index: usize, node: NodeRef) -> bool {
        let Some(entry) = self.finger.get_mut(index) else {
            tracing::error!("set finger index out of range, index: {}", index);
            return false;
        };
        if self
            .space
            .strictly_between(node.id, self.owner.id, entry.start)
        {
            tracing::warn!(
                "reject finger {} of {}: {} precedes start {}",
                index,
                self.owner.id,
                node.id,
                entry.start
            );
            return false;
        }
        tracing::debug!("set finger table index: {} node: {}", index, node);
        entry.node = node;
        true
    }

    /// Overwrite entry 0.
    pub fn set_successor(&mut self, node: NodeRef) -> bool {
        self.set(0, node)
    }

    /// Offer `node` to every entry except the successor, keeping it wherever it lies
    /// at or after the start and closer to it than the current entry.
    pub fn join(&mut self, node: &NodeRef) {
        if node.id == self.owner.id {
            return;
        }
        for entry in self.finger.iter_mut().skip(1) {
            let candidate = self.space.distance(entry.start, node.id);
            // node lies before start
            if candidate >= self.space.distance(entry.start, self.owner.id) {
                continue;
            }
            if candidate < self.space.distance(entry.start, entry.node.id) {
                entry.node = node.clone();
            }
        }
    }

    /// The highest entry whose node lies strictly between the owner and `target`,
    /// or the owner itself when there is none.
    pub fn closest_preceding_finger(&self, target: NodeId) -> &NodeRef {
        for entry in self.finger.iter().rev() {
            if self
                .space
                .strictly_between(entry.node.id, self.owner.id, target)
            {
                return &entry.node;
            }
        }
        &self.owner
    }

    /// Distinct nodes referenced by the table.
    pub fn nodes(&self) -> Vec<&NodeRef> {
        let mut seen: Vec<&NodeRef> = vec![];
        for entry in self.finger.iter() {
            if !seen.iter().any(|n| n.id == entry.node.id) {
                seen.push(&entry.node);
            }
        }
        seen
    }

    /// get finger list
    pub fn list(&self) -> &[Finger] {
        &self.finger
    }

    /// Advance the round-robin cursor over entries `1..m` and return it.
    /// Returns `None` when `m == 1`, entry 0 being kept by stabilization.
    pub(super) fn next_fix_index(&mut self) -> Option<usize> {
        if self.finger.len() < 2 {
            return None;
        }
        let next = self.fix_finger_index as usize + 1;
        let next = if next >= self.finger.len() { 1 } else { next };
        self.fix_finger_index = next as u8;
        Some(next)
    }
}

impl Index<usize> for FingerTable {
    type Output = Finger;
    fn index(&self, index: usize) -> &Self::Output {
        &self.finger[index]
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn node(id: u128) -> NodeRef {
        NodeRef::new(NodeId(id), "127.0.0.1", 8000)
    }

    fn table(owner: u128) -> FingerTable {
        FingerTable::new(IdSpace::new(8).unwrap(), node(owner))
    }

    #[test]
    fn test_new_table_points_at_owner() {
        let t = table(10);
        assert_eq!(t.len(), 8);
        assert_eq!(t.successor().id, NodeId(10));
        let starts: Vec<u128> = t.list().iter().map(|f| f.start.0).collect();
        assert_eq!(starts, vec![11, 12, 14, 18, 26, 42, 74, 138]);
        assert!(t.list().iter().all(|f| f.node.id == NodeId(10)));
    }

    #[test]
    fn test_set_rejects_nodes_before_start() {
        let mut t = table(10);
        // start of index 3 is 18; 15 lies in (10, 18)
        assert!(!t.set(3, node(15)));
        assert_eq!(t[3].node.id, NodeId(10));
        assert!(t.set(3, node(18)));
        assert!(t.set(3, node(200)));
        assert!(!t.set(8, node(200)));
    }

    #[test]
    fn test_set_wrapping_start() {
        let mut t = table(200);
        // start of index 7 is (200 + 128) mod 256 = 72
        assert!(!t.set(7, node(250)));
        assert!(!t.set(7, node(3)));
        assert!(t.set(7, node(72)));
        assert!(t.set(7, node(150)));
    }

    #[test]
    fn test_closest_preceding_finger() {
        let mut t = table(0);
        t.set(0, node(20));
        t.join(&node(20));
        t.join(&node(100));
        t.join(&node(170));

        assert_eq!(t.closest_preceding_finger(NodeId(150)).id, NodeId(100));
        assert_eq!(t.closest_preceding_finger(NodeId(100)).id, NodeId(20));
        assert_eq!(t.closest_preceding_finger(NodeId(250)).id, NodeId(170));
        assert_eq!(t.closest_preceding_finger(NodeId(10)).id, NodeId(0));
    }

    #[test]
    fn test_join_fills_only_improving_entries() {
        let mut t = table(0);
        t.join(&node(100));
        // starts 2,4,...,64 are all covered by 100; start 128 is not
        for i in 1..7 {
            assert_eq!(t[i].node.id, NodeId(100));
        }
        assert_eq!(t[7].node.id, NodeId(0));
        // entry 0 is left to stabilization
        assert_eq!(t[0].node.id, NodeId(0));

        t.join(&node(40));
        assert_eq!(t[5].node.id, NodeId(40));
        assert_eq!(t[6].node.id, NodeId(100));
    }

    #[test]
    fn test_fix_index_round_robin() {
        let mut t = table(0);
        let seen: Vec<usize> = (0..9).filter_map(|_| t.next_fix_index()).collect();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 1, 2]);

        let mut single = FingerTable::new(IdSpace::new(1).unwrap(), node(0));
        assert_eq!(single.next_fix_index(), None);
    }

    proptest! {
        #[test]
        fn prop_closest_preceding_finger(owner: u8, others in proptest::collection::vec(any::<u8>(), 0..12), target: u8) {
            let space = IdSpace::new(8).unwrap();
            let mut t = table(owner as u128);
            for o in others.iter() {
                t.join(&node(*o as u128));
            }
            prop_assume!(target != owner);
            let target = NodeId(target as u128);
            let owner = NodeId(owner as u128);
            let found = t.closest_preceding_finger(target).id;

            prop_assert_ne!(found, target);
            prop_assert!(found == owner || space.strictly_between(found, owner, target));
            // nothing in the table is closer to the target from below
            for f in t.list() {
                prop_assert!(!space.strictly_between(f.node.id, found, target) || f.node.id == owner);
            }
        }

        #[test]
        fn prop_entries_never_precede_start(owner: u8, others in proptest::collection::vec(any::<u8>(), 0..12)) {
            let space = IdSpace::new(8).unwrap();
            let mut t = table(owner as u128);
            for o in others.iter() {
                t.join(&node(*o as u128));
            }
            for f in t.list() {
                prop_assert!(!space.strictly_between(f.node.id, t.owner().id, f.start));
            }
        }
    }
}
