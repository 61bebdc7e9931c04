//! The main concepts of this mod are:
//!
//! The [ConnectionInterface](transport::ConnectionInterface) trait defines a single
//! outbound text channel to a remote endpoint and whether it still reports itself open.
//!
//! The [Connector](transport::Connector) trait opens such channels. It should be
//! implemented once per wire technology. See the [transport] module.

pub mod transport;
