//! Error of chord_core
#![allow(missing_docs)]

use crate::dht::NodeId;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chord-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Identifier width must be within 1..=128 bits, got {0}")]
    InvalidIdentifierBits(u8),

    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("Invalid bootstrap, expect [id@]address:port: {0}")]
    InvalidBootstrap(String),

    #[error("Node id {0} is out of the {1}-bit identifier space")]
    NodeIdOutOfSpace(NodeId, u8),

    #[error("Stabilize interval must be positive")]
    InvalidStabilizeInterval,

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("Message of type {0} requires content")]
    MissingContent(u8),

    #[error("Malformed message content: {0}")]
    MalformedContent(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("JSON serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed on sync lock of ring state")]
    DHTSyncLockError,

    #[error("Failed on sync lock of node callback")]
    CallbackSyncLockError,

    #[error("Failed on sync lock of stabilizer")]
    StabilizerSyncLockError,

    #[error("Failed on sync lock of ring directory")]
    DirectorySyncLockError,

    #[error("Stabilizer of node {0} is already running")]
    StabilizerAlreadyRunning(NodeId),

    #[error("No node registered for {0}")]
    NodeNotFound(String),

    #[error("Node {0} is already registered")]
    NodeAlreadyRegistered(NodeId),

    #[error("Refuse to forward message {0} to self")]
    ForwardToSelf(NodeId),

    #[error("Callback failed: {0}")]
    CallbackFailed(String),

    #[error("Transport error: {0}")]
    Transport(#[from] chord_transport::error::Error),

    #[error("Url parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}
