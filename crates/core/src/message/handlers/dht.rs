use async_trait::async_trait;

use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::FindSuccessorReport;
use crate::message::FindSuccessorSend;
use crate::message::FindSuccessorThen;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;

/// Resolve one hop: answer the origin when the successor is known here,
/// otherwise pass the envelope on unchanged toward the closest preceding finger.
#[async_trait]
impl HandleMsg<FindSuccessorSend> for MessageHandler {
    async fn handle(
        &self,
        ctx: &Envelope,
        msg: &FindSuccessorSend,
    ) -> Result<Vec<MessageHandlerEvent>> {
        match self.dht.find_successor(msg.id)? {
            PeerRingAction::Some(node) => Ok(vec![MessageHandlerEvent::SendReportMessage(
                ctx.clone(),
                Message::FindSuccessorReport(FindSuccessorReport {
                    id: msg.id,
                    node,
                    then: msg.then,
                }),
            )]),
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::FindSuccessor(_)) => {
                Ok(vec![MessageHandlerEvent::ForwardPayload(ctx.clone(), next)])
            }
            PeerRingAction::None => {
                tracing::debug!(
                    "{} still joining, drop find successor of {} from {}",
                    self.dht.id,
                    msg.id,
                    ctx.from
                );
                Ok(vec![])
            }
            act => {
                tracing::error!("Invalid PeerRing Action {:?}", act);
                Ok(vec![])
            }
        }
    }
}

#[async_trait]
impl HandleMsg<FindSuccessorReport> for MessageHandler {
    async fn handle(
        &self,
        _ctx: &Envelope,
        msg: &FindSuccessorReport,
    ) -> Result<Vec<MessageHandlerEvent>> {
        match msg.then {
            FindSuccessorThen::Join => {
                self.dht.on_join_reply(msg.node.clone())?;
            }
            FindSuccessorThen::FixFinger(index) => {
                self.dht.on_finger_found(index, msg.node.clone())?;
            }
        }
        Ok(vec![])
    }
}
