use async_trait::async_trait;

use super::NextHop;
use crate::error::Result;
use crate::message::CustomMessage;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;

#[async_trait]
impl HandleMsg<CustomMessage> for MessageHandler {
    async fn handle(&self, ctx: &Envelope, msg: &CustomMessage) -> Result<Vec<MessageHandlerEvent>> {
        match self.next_hop(msg.id)? {
            NextHop::Local => {
                match self.callback()? {
                    Some(cb) => {
                        if let Err(e) = cb.on_message(ctx).await {
                            tracing::error!("[on_message] callback of {} failed: {}", self.dht.id, e);
                        }
                    }
                    None => tracing::warn!(
                        "No callback registered, skip custom message from {}",
                        ctx.from
                    ),
                }
                Ok(vec![])
            }
            NextHop::Forward(next) => Ok(vec![MessageHandlerEvent::ForwardPayload(ctx.clone(), next)]),
            NextHop::Drop => {
                tracing::warn!("{} cannot route custom message to {} yet", self.dht.id, msg.id);
                Ok(vec![])
            }
        }
    }
}
