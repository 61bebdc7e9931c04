use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::core::transport::ConnectionInterface;
use crate::core::transport::Connector;
use crate::error::Error;
use crate::error::Result;

/// A frame captured by a [DummyConnection].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyDelivery {
    /// The uri the carrying connection was opened with.
    pub uri: Url,
    /// The text frame.
    pub text: String,
}

/// A dummy connection for local testing.
/// Every frame sent is pushed into the outbox of the [DummyConnector] that opened it.
pub struct DummyConnection {
    uri: Url,
    connected: AtomicBool,
    outbox: mpsc::UnboundedSender<DummyDelivery>,
}

/// [DummyConnector] opens [DummyConnection]s without any network.
pub struct DummyConnector {
    outbox: mpsc::UnboundedSender<DummyDelivery>,
    opened: AtomicUsize,
    refuse: AtomicBool,
    open_delay: Option<Duration>,
}

impl DummyConnection {
    /// Simulate the remote side going away.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// The uri this connection was opened with.
    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

impl DummyConnector {
    /// Create a connector and the receiving end of its outbox.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DummyDelivery>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbox,
                opened: AtomicUsize::new(0),
                refuse: AtomicBool::new(false),
                open_delay: None,
            },
            rx,
        )
    }

    /// Delay every open by `ms` milliseconds.
    pub fn with_open_delay(mut self, ms: u64) -> Self {
        self.open_delay = Some(Duration::from_millis(ms));
        self
    }

    /// Make subsequent opens fail.
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of connections successfully opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionInterface for DummyConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed(self.uri.to_string()));
        }
        self.outbox
            .send(DummyDelivery {
                uri: self.uri.clone(),
                text,
            })
            .map_err(|_| Error::ConnectionClosed(self.uri.to_string()))
    }

    async fn close(&self) -> Result<()> {
        self.disconnect();
        Ok(())
    }
}

#[async_trait]
impl Connector for DummyConnector {
    type Connection = DummyConnection;

    async fn connect(&self, uri: &Url) -> Result<Self::Connection> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::ConnectFailed(
                uri.to_string(),
                "refused by dummy connector".to_string(),
            ));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(DummyConnection {
            uri: uri.clone(),
            connected: AtomicBool::new(true),
            outbox: self.outbox.clone(),
        })
    }
}
