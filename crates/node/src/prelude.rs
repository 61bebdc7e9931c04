//! A prelude is provided which imports all the important data types and traits of the chord ring.
/// Use this when you want to quickly bootstrap a new project.
pub use chord_core;
pub use chord_transport;

pub use self::chord_core::dht::Bootstrap;
pub use self::chord_core::dht::NodeId;
pub use self::chord_core::dht::NodeRef;
pub use self::chord_core::dht::PeerRing;
pub use self::chord_core::directory::RingDirectory;
pub use self::chord_core::inspect::DHTInspect;
pub use self::chord_core::message::Envelope;
pub use self::chord_core::message::KeyedOperation;
pub use self::chord_core::message::Message;
pub use self::chord_core::message::PayloadSender;
pub use self::chord_core::swarm::callback::NodeCallback;
pub use self::chord_core::swarm::callback::SharedNodeCallback;
pub use self::chord_core::swarm::ChordNode;
pub use self::chord_core::swarm::ChordNodeBuilder;
pub use self::chord_core::transport::SwarmTransport;
