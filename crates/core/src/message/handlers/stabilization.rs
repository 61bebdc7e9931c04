use async_trait::async_trait;

use crate::error::Result;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::message::MessageHandler;
use crate::message::MessageHandlerEvent;
use crate::message::NotifyPredecessorSend;
use crate::message::QueryPredecessorReport;
use crate::message::QueryPredecessorSend;

#[async_trait]
impl HandleMsg<NotifyPredecessorSend> for MessageHandler {
    async fn handle(
        &self,
        ctx: &Envelope,
        _msg: &NotifyPredecessorSend,
    ) -> Result<Vec<MessageHandlerEvent>> {
        self.dht.notify(ctx.from.clone())?;
        Ok(vec![])
    }
}

#[async_trait]
impl HandleMsg<QueryPredecessorSend> for MessageHandler {
    async fn handle(
        &self,
        ctx: &Envelope,
        _msg: &QueryPredecessorSend,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let predecessor = self.dht.predecessor()?;
        Ok(vec![MessageHandlerEvent::SendReportMessage(
            ctx.clone(),
            Message::QueryPredecessorReport(QueryPredecessorReport {
                id: self.dht.id,
                predecessor,
            }),
        )])
    }
}

/// The second half of stabilize: adopt the predecessor of our successor when it
/// sits between us, then notify it.
#[async_trait]
impl HandleMsg<QueryPredecessorReport> for MessageHandler {
    async fn handle(
        &self,
        ctx: &Envelope,
        msg: &QueryPredecessorReport,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let act = self.dht.stabilize(ctx.from.id, msg.predecessor.clone())?;
        Ok(self.dht_events(&act))
    }
}
