use std::sync::Arc;

use async_trait::async_trait;

use crate::message::Envelope;
use crate::message::KeyedOperation;

/// Error returned by callbacks. Logged by the node, never propagated.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Any object that implements this trait can be registered on a
/// [ChordNode](super::ChordNode) to receive what the ring resolves locally.
#[async_trait]
pub trait NodeCallback {
    /// Used to turn object into [SharedNodeCallback].
    fn shared(self) -> SharedNodeCallback
    where Self: Sized + Send + Sync + 'static {
        Arc::new(self)
    }

    /// This method is invoked when an application message reaches its target.
    /// The content is passed verbatim inside `envelope`.
    async fn on_message(&self, _envelope: &Envelope) -> Result<(), CallbackError> {
        Ok(())
    }

    /// This method is invoked when this node owns the key of a keyed operation.
    async fn on_keyed_operation(
        &self,
        _envelope: &Envelope,
        _operation: &KeyedOperation,
    ) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Callback shared between the node and its message handler.
pub type SharedNodeCallback = Arc<dyn NodeCallback + Send + Sync>;
