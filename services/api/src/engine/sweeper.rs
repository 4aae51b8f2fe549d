//! services/api/src/engine/sweeper.rs
//!
//! The periodic TTL sweep over the session store, owned and cancellable
//! rather than a fire-and-forget daemon thread. The binary holds the
//! handle and shuts the sweeper down with the rest of the process.

use crate::engine::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Handle to the running sweep task.
pub struct SessionSweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    /// Spawns the sweep loop: every `interval`, evict sessions inactive
    /// for longer than `ttl`. The sweep runs independently of request
    /// handling and may race an in-flight turn; that is the store's
    /// documented tradeoff, not the sweeper's concern.
    pub fn spawn(store: Arc<SessionStore>, ttl: Duration, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh start
            // does not sweep an empty store.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        info!("Session sweeper shutting down.");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = store.evict_expired(ttl);
                        if evicted > 0 {
                            info!("Session sweep evicted {} inactive session(s).", evicted);
                        } else {
                            debug!("Session sweep found no expired sessions.");
                        }
                    }
                }
            }
        });

        Self { token, handle }
    }

    /// Cancels the sweep loop and waits for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}
