//! Template Sweep Task
//!
//! Background task that periodically evicts templates which have been in
//! memory for longer than the maximum duration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::EntryStore;

// == Sweep Schedule ==
/// Settings the sweep task runs with, published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    /// Entries loaded longer ago than this are evicted
    pub max_duration: Duration,
    /// Time between two sweeps
    pub interval: Duration,
    /// Cleared to stop the task
    pub running: bool,
}

impl SweepSchedule {
    pub fn new(max_duration: Duration, interval: Duration) -> Self {
        Self {
            max_duration,
            interval,
            running: true,
        }
    }
}

/// Runs one sweep pass over `store` and logs what it evicted.
pub async fn sweep_once<T>(store: &RwLock<EntryStore<T>>, max_duration: Duration) -> usize {
    let evicted = store.write().await.evict_older_than(max_duration);

    if evicted > 0 {
        info!("Template sweep: evicted {} aged templates", evicted);
    } else {
        debug!("Template sweep: no aged templates found");
    }
    evicted
}

/// Spawns the task that keeps `store` free of aged templates.
///
/// The task sweeps once immediately, then sleeps for the scheduled interval
/// and sweeps again, forever. Publishing a new [`SweepSchedule`] cancels the
/// pending sleep: the task sweeps right away under the new maximum duration
/// and re-arms with the new interval, so there is never more than one timer.
///
/// The task stops when the schedule is published with `running == false` or
/// when the sending side of the channel is dropped.
///
/// # Arguments
/// * `store` - The entry store shared with the cache
/// * `schedule` - Receiving side of the cache's schedule channel
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(EntryStore::<String>::new()));
/// let (tx, rx) = watch::channel(SweepSchedule::new(Duration::from_secs(60), Duration::from_secs(10)));
/// let handle = spawn_sweep_task(store, rx);
/// // Later, to stop it:
/// drop(tx);
/// ```
pub fn spawn_sweep_task<T>(
    store: Arc<RwLock<EntryStore<T>>>,
    mut schedule: watch::Receiver<SweepSchedule>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut current = *schedule.borrow_and_update();
        info!(
            "Starting template sweep task: max_duration={:?}, interval={:?}",
            current.max_duration, current.interval
        );

        loop {
            if !current.running {
                info!("Template sweep task stopped");
                break;
            }

            sweep_once(&store, current.max_duration).await;

            tokio::select! {
                _ = tokio::time::sleep(current.interval) => {}
                changed = schedule.changed() => {
                    if changed.is_err() {
                        info!("Template cache dropped, stopping sweep task");
                        break;
                    }
                    current = *schedule.borrow_and_update();
                    debug!(
                        "Sweep schedule updated: max_duration={:?}, interval={:?}",
                        current.max_duration, current.interval
                    );
                }
            }
        }
    })
}
