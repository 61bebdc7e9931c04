//! Bridge between ring members and the outbound [ConnectionCache].

use std::sync::Arc;

use async_trait::async_trait;
use chord_transport::ConnectionCache;
use chord_transport::Connector;
use url::Url;

use crate::consts::DEFAULT_SCHEME;
use crate::consts::RECEIVE_PATH_PREFIX;
use crate::consts::RECEIVE_PATH_SUFFIX;
use crate::dht::NodeId;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::PayloadSender;

/// A [PayloadSender] over a process-wide [ConnectionCache].
///
/// Channels are keyed by `address:port`, so all members hosted behind one
/// endpoint share a channel. The receiving side demultiplexes on the id in
/// the uri path and on the `to` field of each envelope.
pub struct SwarmTransport<T: Connector> {
    cache: Arc<ConnectionCache<T>>,
    scheme: String,
}

impl<T: Connector> SwarmTransport<T> {
    /// Create a transport dialing with `connector` over `ws`.
    pub fn new(connector: T) -> Self {
        Self::with_cache(Arc::new(ConnectionCache::new(connector)))
    }

    /// Create a transport on an existing cache.
    pub fn with_cache(cache: Arc<ConnectionCache<T>>) -> Self {
        Self {
            cache,
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }

    /// Use another uri scheme, `wss` for instance.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// The shared channel cache.
    pub fn cache(&self) -> Arc<ConnectionCache<T>> {
        self.cache.clone()
    }

    /// The inbound route of `target` on `address:port`.
    pub fn uri(&self, address: &str, port: u16, target: NodeId) -> Result<Url> {
        let raw = format!(
            "{}://{}:{}{}/{}/{}",
            self.scheme, address, port, RECEIVE_PATH_PREFIX, target, RECEIVE_PATH_SUFFIX
        );
        Ok(Url::parse(&raw)?)
    }
}

#[async_trait]
impl<T: Connector> PayloadSender for SwarmTransport<T> {
    async fn send_payload(&self, address: &str, port: u16, envelope: &Envelope) -> Result<()> {
        let endpoint = format!("{}:{}", address, port);
        let uri = self.uri(address, port, envelope.target_id())?;
        let text = envelope.to_json()?;
        tracing::debug!(
            "send {:?} from {} to {}",
            envelope.message.message_type(),
            envelope.from.id,
            uri
        );
        self.cache.send(&endpoint, &uri, text).await?;
        Ok(())
    }
}
