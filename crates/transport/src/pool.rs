//! This module contains the [ConnectionCache] struct.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use url::Url;

use crate::core::transport::ConnectionInterface;
use crate::core::transport::Connector;
use crate::error::Error;
use crate::error::Result;

type Slot<C> = Arc<OnceCell<Arc<C>>>;

/// [ConnectionCache] maps a remote endpoint (`address:port`) to one open channel.
///
/// Each endpoint owns a slot that is created atomically inside the map and then
/// initialized at most once, so concurrent senders to the same endpoint wait on a
/// single pending open instead of dialing twice. A slot whose connection reports
/// itself closed is evicted and replaced by a fresh one on next use.
pub struct ConnectionCache<T: Connector> {
    connector: T,
    connections: DashMap<String, Slot<T::Connection>>,
}

impl<T: Connector> ConnectionCache<T> {
    /// Create a new [ConnectionCache] dialing with `connector`.
    pub fn new(connector: T) -> Self {
        Self {
            connector,
            connections: DashMap::new(),
        }
    }

    /// The connector used to open new channels.
    pub fn connector(&self) -> &T {
        &self.connector
    }

    /// Get an already opened connection by endpoint.
    /// Pending opens are not returned.
    pub fn connection(&self, endpoint: &str) -> Option<Arc<T::Connection>> {
        self.connections
            .get(endpoint)
            .and_then(|slot| slot.get().cloned())
    }

    /// All endpoints currently holding a slot, opened or pending.
    pub fn endpoints(&self) -> Vec<String> {
        self.connections.iter().map(|kv| kv.key().clone()).collect()
    }

    /// Number of cached slots.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the cache holds no slot.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Return the open connection for `endpoint`, dialing `uri` if there is none.
    ///
    /// A cached connection that reports disconnected is evicted first, then a new
    /// one is opened in its place.
    pub async fn get_or_connect(&self, endpoint: &str, uri: &Url) -> Result<Arc<T::Connection>> {
        let slot = self.slot(endpoint);

        if let Some(conn) = slot.get() {
            if conn.is_connected() {
                return Ok(conn.clone());
            }
            tracing::info!("evict disconnected connection to {}", endpoint);
            self.evict_slot(endpoint, &slot);
            let fresh = self.slot(endpoint);
            return self.open(endpoint, &fresh, uri).await;
        }

        self.open(endpoint, &slot, uri).await
    }

    /// Send `text` to `endpoint`, opening a channel to `uri` when needed.
    ///
    /// On failure the connection is evicted so the next send dials again.
    pub async fn send(&self, endpoint: &str, uri: &Url, text: String) -> Result<()> {
        let conn = self.get_or_connect(endpoint, uri).await?;

        if let Err(e) = conn.send_text(text).await {
            tracing::warn!("send to {} failed: {}", endpoint, e);
            let removed = self
                .connections
                .remove_if(endpoint, |_, slot| {
                    slot.get().map(|c| Arc::ptr_eq(c, &conn)).unwrap_or(false)
                })
                .is_some();
            if removed {
                let _ = conn.close().await;
            }
            return Err(e);
        }

        Ok(())
    }

    /// Remove and close the connection of `endpoint`.
    pub async fn remove(&self, endpoint: &str) -> Result<()> {
        let Some((_, slot)) = self.connections.remove(endpoint) else {
            return Err(Error::ConnectionNotFound(endpoint.to_string()));
        };
        match slot.get() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }

    fn slot(&self, endpoint: &str) -> Slot<T::Connection> {
        self.connections
            .entry(endpoint.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn evict_slot(&self, endpoint: &str, slot: &Slot<T::Connection>) {
        self.connections
            .remove_if(endpoint, |_, current| Arc::ptr_eq(current, slot));
    }

    async fn open(
        &self,
        endpoint: &str,
        slot: &Slot<T::Connection>,
        uri: &Url,
    ) -> Result<Arc<T::Connection>> {
        let opened = slot
            .get_or_try_init(|| async {
                tracing::debug!("open connection to {}", uri);
                self.connector.connect(uri).await.map(Arc::new)
            })
            .await;

        match opened {
            Ok(conn) => Ok(conn.clone()),
            Err(e) => {
                self.evict_slot(endpoint, slot);
                Err(e)
            }
        }
    }
}
