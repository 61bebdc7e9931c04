//! Stabilization run daemons to maintain dht.

use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::swarm::ChordNode;

/// The stabilization runner.
/// Holds the node weakly, so a dropped node ends its own loop.
#[derive(Clone)]
pub struct Stabilizer {
    node: Weak<ChordNode>,
    interval: Duration,
}

/// A running [Stabilizer]. Cancelled on [StabilizerHandle::stop] or drop.
pub struct StabilizerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(node: &Arc<ChordNode>, interval: Duration) -> Self {
        Self {
            node: Arc::downgrade(node),
            interval,
        }
    }

    /// Period between two ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self) -> StabilizerHandle {
        let token = CancellationToken::new();
        let child = token.child_token();
        let handle = tokio::spawn(self.wait(child));
        StabilizerHandle { token, handle }
    }

    /// Run stabilization in a loop until `token` is cancelled.
    pub async fn wait(self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(node) = self.node.upgrade() else {
                        break;
                    };
                    node.tick()
                        .await
                        .unwrap_or_else(|e| tracing::error!("failed to stabilize {:?}", e));
                }
            }
        }
        tracing::debug!("stabilizer stopped");
    }
}

impl StabilizerHandle {
    /// Stop the loop. The tick in progress, if any, still completes.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for StabilizerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
