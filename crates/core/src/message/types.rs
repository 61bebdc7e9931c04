#![warn(missing_docs)]
//! This module defines the message structures exchanged between ring members.
//! Ring-management messages follow the Send/Report pattern: every xxxSend that
//! expects an answer is answered by the matching xxxReport.
//!
//! On the wire every message is `{"type": <code>, "id": "<hex>", "content": ...}`.
//! The type code alone does not always pick the variant: code 4 carries both
//! reports, told apart by the key of their content.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::dht::NodeId;
use crate::dht::NodeRef;
use crate::error::Error;
use crate::error::Result;

/// Wire type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum MessageType {
    /// Opaque payload for the application.
    Application = 0,
    /// Resolve the successor of an id.
    FindSuccessor = 1,
    /// The sender believes it is the predecessor of the receiver.
    Notify = 2,
    /// Ask the receiver for its predecessor.
    QueryPredecessor = 3,
    /// Answer to [MessageType::FindSuccessor] or [MessageType::QueryPredecessor].
    Reply = 4,
    /// A get/put addressed to the owner of a key.
    KeyedOperation = 5,
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Application),
            1 => Ok(Self::FindSuccessor),
            2 => Ok(Self::Notify),
            3 => Ok(Self::QueryPredecessor),
            4 => Ok(Self::Reply),
            5 => Ok(Self::KeyedOperation),
            n => Err(Error::UnknownMessageType(n)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> Self {
        t as u8
    }
}

/// MessageType use to carry application payload. Never interpreted by the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomMessage {
    /// did of target
    pub id: NodeId,
    /// anything the application sends
    pub content: Value,
}

/// MessageType use to find successor in a chord ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindSuccessorSend {
    /// the id being resolved
    pub id: NodeId,
    /// what the origin does with the answer
    pub then: FindSuccessorThen,
}

/// MessageType use to report origin node with the resolved successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindSuccessorReport {
    /// the id that was resolved
    pub id: NodeId,
    /// its successor
    pub node: NodeRef,
    /// copied from [FindSuccessorSend]
    pub then: FindSuccessorThen,
}

/// MessageType use to notify the successor that the sender may be its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPredecessorSend {
    /// The id for notify target
    pub id: NodeId,
}

/// MessageType use to ask a node for its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredecessorSend {
    /// The id for query target
    pub id: NodeId,
}

/// MessageType report to origin with the predecessor of the queried node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredecessorReport {
    /// The id of the queried node
    pub id: NodeId,
    /// Its predecessor
    pub predecessor: Option<NodeRef>,
}

/// MessageType use to operate on the value of a key at its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedOperationSend {
    /// The hashed key
    pub id: NodeId,
    /// The operation
    pub operation: KeyedOperation,
}

/// Get/put-shaped operation. How the owner persists it is up to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum KeyedOperation {
    /// Read the value of `key`.
    Get {
        /// The key before hashing
        key: String,
    },
    /// Write `value` under `key`.
    Put {
        /// The key before hashing
        key: String,
        /// Any value
        value: Value,
    },
}

impl KeyedOperation {
    /// The key before hashing.
    pub fn key(&self) -> &str {
        match self {
            Self::Get { key } => key,
            Self::Put { key, .. } => key,
        }
    }
}

/// What the origin of a [FindSuccessorSend] does with the answer.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindSuccessorThen {
    /// Take the answer as successor and finish joining.
    Join,
    /// Store the answer in the finger at this index.
    FixFinger(u8),
}

/// A collection of all messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage", into = "RawMessage")]
#[non_exhaustive]
pub enum Message {
    /// Wire type 0.
    CustomMessage(CustomMessage),
    /// Wire type 1.
    FindSuccessorSend(FindSuccessorSend),
    /// Wire type 2.
    NotifyPredecessorSend(NotifyPredecessorSend),
    /// Wire type 3.
    QueryPredecessorSend(QueryPredecessorSend),
    /// Wire type 4, answering [Message::FindSuccessorSend].
    FindSuccessorReport(FindSuccessorReport),
    /// Wire type 4, answering [Message::QueryPredecessorSend].
    QueryPredecessorReport(QueryPredecessorReport),
    /// Wire type 5.
    KeyedOperationSend(KeyedOperationSend),
}

impl Message {
    /// The wire type code.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CustomMessage(_) => MessageType::Application,
            Self::FindSuccessorSend(_) => MessageType::FindSuccessor,
            Self::NotifyPredecessorSend(_) => MessageType::Notify,
            Self::QueryPredecessorSend(_) => MessageType::QueryPredecessor,
            Self::FindSuccessorReport(_) | Self::QueryPredecessorReport(_) => MessageType::Reply,
            Self::KeyedOperationSend(_) => MessageType::KeyedOperation,
        }
    }

    /// The `id` field on the wire.
    pub fn id(&self) -> NodeId {
        match self {
            Self::CustomMessage(m) => m.id,
            Self::FindSuccessorSend(m) => m.id,
            Self::NotifyPredecessorSend(m) => m.id,
            Self::QueryPredecessorSend(m) => m.id,
            Self::FindSuccessorReport(m) => m.id,
            Self::QueryPredecessorReport(m) => m.id,
            Self::KeyedOperationSend(m) => m.id,
        }
    }
}

/// The wire shape of a [Message].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    kind: MessageType,
    id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct FindSuccessorContent {
    then: FindSuccessorThen,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReplyContent {
    Successor {
        node: NodeRef,
        then: FindSuccessorThen,
    },
    Predecessor(Option<NodeRef>),
}

fn parse_content<T: DeserializeOwned>(kind: MessageType, content: Option<Value>) -> Result<T> {
    let content = content.ok_or(Error::MissingContent(kind.into()))?;
    serde_json::from_value(content).map_err(|e| Error::MalformedContent(e.to_string()))
}

impl TryFrom<RawMessage> for Message {
    type Error = Error;

    fn try_from(raw: RawMessage) -> Result<Self> {
        let RawMessage { kind, id, content } = raw;
        Ok(match kind {
            MessageType::Application => Self::CustomMessage(CustomMessage {
                id,
                content: content.unwrap_or(Value::Null),
            }),
            MessageType::FindSuccessor => {
                let FindSuccessorContent { then } = parse_content(kind, content)?;
                Self::FindSuccessorSend(FindSuccessorSend { id, then })
            }
            MessageType::Notify => Self::NotifyPredecessorSend(NotifyPredecessorSend { id }),
            MessageType::QueryPredecessor => {
                Self::QueryPredecessorSend(QueryPredecessorSend { id })
            }
            MessageType::Reply => match parse_content(kind, content)? {
                ReplyContent::Successor { node, then } => {
                    Self::FindSuccessorReport(FindSuccessorReport { id, node, then })
                }
                ReplyContent::Predecessor(predecessor) => {
                    Self::QueryPredecessorReport(QueryPredecessorReport { id, predecessor })
                }
            },
            MessageType::KeyedOperation => Self::KeyedOperationSend(KeyedOperationSend {
                id,
                operation: parse_content(kind, content)?,
            }),
        })
    }
}

impl From<Message> for RawMessage {
    fn from(msg: Message) -> Self {
        let kind = msg.message_type();
        let (id, content) = match msg {
            Message::CustomMessage(m) => (m.id, Some(m.content)),
            Message::FindSuccessorSend(m) => (
                m.id,
                serde_json::to_value(FindSuccessorContent { then: m.then }).ok(),
            ),
            Message::NotifyPredecessorSend(m) => (m.id, None),
            Message::QueryPredecessorSend(m) => (m.id, None),
            Message::FindSuccessorReport(m) => (
                m.id,
                serde_json::to_value(ReplyContent::Successor {
                    node: m.node,
                    then: m.then,
                })
                .ok(),
            ),
            Message::QueryPredecessorReport(m) => (
                m.id,
                serde_json::to_value(ReplyContent::Predecessor(m.predecessor)).ok(),
            ),
            Message::KeyedOperationSend(m) => (m.id, serde_json::to_value(m.operation).ok()),
        };
        Self { kind, id, content }
    }
}
