//! Expiration Scan Task
//!
//! Background task that periodically removes expired memory cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::backend::memory::MemoryStore;

/// Spawns a background task that periodically drops expired entries.
///
/// The task holds only a weak reference to the store and exits once the
/// store has been dropped. Reads already remove expired entries lazily; the
/// scan reclaims memory held by entries nobody reads again.
///
/// # Arguments
/// * `store` - Weak reference to the shared memory store
/// * `interval` - Time between scans
///
/// # Returns
/// A JoinHandle that can be used to abort the task early.
pub fn spawn_expiration_scan(
    store: Weak<RwLock<MemoryStore>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting memory cache expiration scan every {:?}", interval);

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(store) = store.upgrade() else {
                debug!("Memory cache dropped, stopping expiration scan");
                break;
            };

            let (removed, stats) = {
                let mut guard = store.write().await;
                let removed = guard.cleanup_expired(Instant::now());
                (removed, guard.stats())
            };
            if removed > 0 {
                info!(
                    "Expiration scan: removed {} expired entries ({} live, hit rate {:.1}%)",
                    removed,
                    stats.total_entries,
                    stats.hit_rate() * 100.0
                );
            } else {
                debug!("Expiration scan: no expired entries found");
            }
        }
    })
}
