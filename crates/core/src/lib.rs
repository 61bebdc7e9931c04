//! Chord: a ring-structured distributed hash table.
//! --------------
//! - [Chord](crate::dht::PeerRing) keeps one member's view of the ring: its successor,
//!   predecessor and finger table over an m-bit [identifier space](crate::dht::IdSpace).
//! - [ChordNode](crate::swarm::ChordNode) drives a [PeerRing](crate::dht::PeerRing):
//!   it joins, stabilizes periodically and dispatches inbound envelopes.
//! - [RingDirectory](crate::directory::RingDirectory) hosts many nodes in one process
//!   and routes inbound frames to them.
//! - [SwarmTransport](crate::transport::SwarmTransport) sends envelopes over a shared,
//!   cached set of outbound channels.
//!
//! # Join Ring
//!
//! 1. A node that knows no one starts a new ring; it is its own successor.
//! 2. A node that knows a bootstrap endpoint asks it for the successor of its own id,
//!   and stays `Joining` until the answer arrives. Lookups are not resolved meanwhile.
//! 3. Once it has a successor, the periodic stabilization asks the successor for its
//!   predecessor, adopts it when it sits between them, and notifies the successor.
//!   One finger is refreshed per round.
//!
//! # Ownership
//!
//! A node owns the ids in `(predecessor, self]`. Keyed operations and application
//! messages are forwarded one hop at a time, through the closest preceding finger,
//! until they reach the owner.
#![warn(missing_docs)]

pub mod consts;
pub mod dht;
pub mod directory;
pub mod error;
pub mod inspect;
pub mod message;
pub mod swarm;
pub mod transport;

#[cfg(test)]
mod tests;

pub use chord_transport;
