use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use super::registry::RoomRegistry;
use crate::config::RoomConfig;

/// Background sweeper that evicts rooms nobody has touched for a while
pub struct Janitor {
    registry: Arc<RoomRegistry>,
    sweep_interval: Duration,
    idle_timeout: Duration,
}

impl Janitor {
    pub fn new(registry: Arc<RoomRegistry>, sweep_interval: Duration, idle_timeout: Duration) -> Self {
        Self {
            registry,
            sweep_interval,
            idle_timeout,
        }
    }

    pub fn from_config(registry: Arc<RoomRegistry>, config: &RoomConfig) -> Self {
        Self::new(registry, config.sweep_interval, config.idle_timeout)
    }

    /// Runs one sweep and returns the evicted room ids
    pub async fn sweep(&self) -> Vec<String> {
        let evicted = self.registry.evict_idle(self.idle_timeout).await;
        if !evicted.is_empty() {
            tracing::info!(evicted = evicted.len(), "Idle room sweep finished");
        }
        evicted
    }

    /// Spawns the sweep loop.
    ///
    /// The first sweep runs immediately. The loop exits once `shutdown`
    /// reads `true` or its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                sweep_interval_secs = self.sweep_interval.as_secs(),
                idle_timeout_secs = self.idle_timeout.as_secs(),
                "Room janitor started"
            );

            let mut ticker = time::interval(self.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Room janitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);
    const IDLE: Duration = Duration::from_secs(2 * 60 * 60);

    /// Lets the spawned janitor task run up to its next await point
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_only_idle_rooms() {
        let registry = Arc::new(RoomRegistry::new());
        let janitor = Janitor::new(registry.clone(), MINUTE, IDLE);

        let old = registry.create_room().await.unwrap();
        time::advance(IDLE).await;
        let young = registry.create_room().await.unwrap();

        assert_eq!(janitor.sweep().await, vec![old.clone()]);
        assert!(!registry.exists(&old).await);
        assert!(registry.exists(&young).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_rooms_with_entries() {
        let registry = Arc::new(RoomRegistry::new());
        let janitor = Janitor::new(registry.clone(), MINUTE, IDLE);

        let room_id = registry.create_room().await.unwrap();
        registry.append(&room_id, "unclaimed".to_string()).await.unwrap();
        time::advance(IDLE + MINUTE).await;

        assert_eq!(janitor.sweep().await.len(), 1);
        assert!(!registry.exists(&room_id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_loop_evicts_after_timeout() {
        let registry = Arc::new(RoomRegistry::new());
        let room_id = registry.create_room().await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Janitor::new(registry.clone(), MINUTE, IDLE).spawn(shutdown_rx);
        settle().await;
        assert!(registry.exists(&room_id).await);

        time::advance(IDLE - MINUTE).await;
        settle().await;
        assert!(registry.exists(&room_id).await);

        time::advance(MINUTE).await;
        settle().await;
        assert!(!registry.exists(&room_id).await);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_room_alive() {
        let registry = Arc::new(RoomRegistry::new());
        let room_id = registry.create_room().await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Janitor::new(registry.clone(), MINUTE, IDLE).spawn(shutdown_rx);

        for _ in 0..4 {
            time::advance(Duration::from_secs(60 * 60)).await;
            settle().await;
            registry.count(&room_id).await.unwrap();
        }
        assert!(registry.exists(&room_id).await);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_sender_dropped() {
        let registry = Arc::new(RoomRegistry::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Janitor::new(registry, MINUTE, IDLE).spawn(shutdown_rx);

        drop(shutdown_tx);
        handle.await.unwrap();
    }
}
