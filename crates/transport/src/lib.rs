#![warn(missing_docs)]
//! Outbound transport for the chord ring.
//!
//! A process keeps one [ConnectionCache](pool::ConnectionCache) shared by every ring
//! member it hosts. The cache owns a [Connector](core::transport::Connector) that knows
//! how to dial a remote endpoint, and hands out cached channels keyed by `address:port`.
//! Delivery is fire-and-forget.
pub mod connections;
pub mod core;
pub mod error;
pub mod pool;

pub use crate::core::transport::ConnectionInterface;
pub use crate::core::transport::Connector;
pub use crate::pool::ConnectionCache;
