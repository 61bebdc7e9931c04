use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// An open outbound channel to one remote endpoint.
#[async_trait]
pub trait ConnectionInterface: Send + Sync + 'static {
    /// Whether the channel still reports itself open.
    /// A cached connection that returns false here is evicted on next use.
    fn is_connected(&self) -> bool;

    /// Queue a text frame for delivery. No acknowledgment is awaited.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Close the channel. Closing twice is not an error.
    async fn close(&self) -> Result<()>;
}

/// Opens [ConnectionInterface] channels.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: ConnectionInterface;

    /// Dial `uri` and resolve once the channel is ready to send.
    async fn connect(&self, uri: &Url) -> Result<Self::Connection>;
}
