use async_trait::async_trait;

use super::NextHop;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::KeyedOperationSend;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;

/// Keyed operations are resolved by the owner of `(predecessor, self]` and
/// forwarded one hop otherwise. What resolving means is left to the callback.
#[async_trait]
impl HandleMsg<KeyedOperationSend> for MessageHandler {
    async fn handle(
        &self,
        ctx: &Envelope,
        msg: &KeyedOperationSend,
    ) -> Result<Vec<MessageHandlerEvent>> {
        match self.next_hop(msg.id)? {
            NextHop::Local => {
                tracing::debug!(
                    "{} owns key {:?} ({})",
                    self.dht.id,
                    msg.operation.key(),
                    msg.id
                );
                if let Some(cb) = self.callback()? {
                    if let Err(e) = cb.on_keyed_operation(ctx, &msg.operation).await {
                        tracing::error!(
                            "[on_keyed_operation] callback of {} failed: {}",
                            self.dht.id,
                            e
                        );
                    }
                }
                Ok(vec![])
            }
            NextHop::Forward(next) => Ok(vec![MessageHandlerEvent::ForwardPayload(
                ctx.clone(),
                next,
            )]),
            NextHop::Drop => {
                tracing::warn!(
                    "{} cannot route keyed operation on {} yet",
                    self.dht.id,
                    msg.id
                );
                Ok(vec![])
            }
        }
    }
}
