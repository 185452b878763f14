//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries, on top
//! of the lazy eviction on read and the probabilistic sweep on write.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that sweeps expired entries every
/// `interval_secs` seconds.
///
/// Returns the task handle so it can be aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = SharedCache::new(CacheStore::new(), Duration::from_secs(300));
/// let sweep_handle = spawn_sweep_task(cache.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<T>(cache: SharedCache<T>, interval_secs: u64) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
{
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired().await;

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
