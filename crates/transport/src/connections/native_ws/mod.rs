use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::core::transport::ConnectionInterface;
use crate::core::transport::Connector;
use crate::error::Error;
use crate::error::Result;

/// An outbound websocket channel.
///
/// Frames are handed to a writer task through an unbounded queue, so `send_text`
/// never waits on the network. The channel flips to disconnected as soon as either
/// the writer or the reader side observes the socket closing.
pub struct WsConnection {
    uri: Url,
    connected: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<WsMessage>,
}

/// Dials [WsConnection]s with tokio-tungstenite.
#[derive(Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl ConnectionInterface for WsConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed(self.uri.to_string()));
        }
        self.sender
            .send(WsMessage::Text(text))
            .map_err(|_| Error::ConnectionClosed(self.uri.to_string()))
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.sender.send(WsMessage::Close(None));
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Connection = WsConnection;

    async fn connect(&self, uri: &Url) -> Result<Self::Connection> {
        let (stream, _) = tokio_tungstenite::connect_async(uri.as_str()).await?;
        let (mut sink, mut source) = stream.split();
        let connected = Arc::new(AtomicBool::new(true));
        let (sender, mut receiver) = mpsc::unbounded_channel::<WsMessage>();

        let writer_state = connected.clone();
        let writer_uri = uri.clone();
        tokio::spawn(async move {
            while let Some(msg) = receiver.recv().await {
                let closing = matches!(msg, WsMessage::Close(_));
                if let Err(e) = sink.send(msg).await {
                    tracing::warn!("websocket write to {} failed: {}", writer_uri, e);
                    break;
                }
                if closing {
                    break;
                }
            }
            writer_state.store(false, Ordering::SeqCst);
            let _ = sink.close().await;
        });

        let reader_state = connected.clone();
        let reader_uri = uri.clone();
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("websocket read from {} failed: {}", reader_uri, e);
                        break;
                    }
                }
            }
            reader_state.store(false, Ordering::SeqCst);
        });

        tracing::info!("websocket connected to {}", uri);
        Ok(WsConnection {
            uri: uri.clone(),
            connected,
            sender,
        })
    }
}
