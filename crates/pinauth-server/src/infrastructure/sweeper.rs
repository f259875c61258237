//! Background task that purges expired sessions.
//!
//! Lookups already treat sessions older than the TTL as absent, so this task
//! only reclaims memory; its interval does not affect correctness.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use pinauth_core::SessionRegistry;

/// Spawns the sweeper.  It runs every `every` until `running` is cleared.
pub fn spawn_expiry_sweeper(
    registry: SessionRegistry,
    every: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // The first tick fires immediately.

        while running.load(Ordering::Relaxed) {
            ticker.tick().await;
            match registry.purge_expired().await {
                Ok(0) => {}
                Ok(n) => debug!("sweeper purged {n} expired session(s)"),
                Err(e) => warn!("expiry sweep failed: {e}"),
            }
        }
        debug!("expiry sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinauth_core::{ConnectionId, MemorySessionStore, Pin, SESSION_TTL};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_records() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = SessionRegistry::new(store.clone());
        let running = Arc::new(AtomicBool::new(true));
        registry
            .claim(&Pin::parse("4242").unwrap(), ConnectionId::new())
            .await
            .unwrap();

        let handle = spawn_expiry_sweeper(registry, Duration::from_secs(30), running.clone());

        tokio::time::sleep(SESSION_TTL + Duration::from_secs(31)).await;
        assert!(store.is_empty().await);

        running.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_live_records() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = SessionRegistry::new(store.clone());
        let running = Arc::new(AtomicBool::new(true));
        registry
            .claim(&Pin::parse("4242").unwrap(), ConnectionId::new())
            .await
            .unwrap();

        let _handle = spawn_expiry_sweeper(registry, Duration::from_secs(30), running);

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert_eq!(store.len().await, 1);
    }
}
