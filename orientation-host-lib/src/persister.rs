use std::{sync::Arc, time::Duration};

use log::{debug, error, trace, warn};
use tokio::{
    sync::watch,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::{
    clock::Clock,
    config::StoreErrorPolicy,
    orientation::Orientation,
    record::{NewOrientationRecord, OrientationRecord},
    shutdown::Shutdown,
    store::{OrientationStore, StoreError},
};

/// Snapshots the current orientation into the store on a fixed period.
pub struct Persister {
    store: Arc<dyn OrientationStore>,
    orientation: watch::Receiver<Option<Orientation>>,
    clock: Arc<dyn Clock>,
    revision: watch::Sender<u64>,
    // None until the newest stored timestamp has been read back
    last_timestamp: Option<u64>,
}

impl Persister {
    pub fn new(
        store: Arc<dyn OrientationStore>,
        orientation: watch::Receiver<Option<Orientation>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            store,
            orientation,
            clock,
            revision,
            last_timestamp: None,
        }
    }

    /// Id of the newest record this persister wrote, 0 before the first one
    pub fn subscribe_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Writes one record if an orientation is available.
    pub async fn tick(&mut self) -> Result<Option<OrientationRecord>, StoreError> {
        let current = *self.orientation.borrow();
        let Some(orientation) = current else {
            trace!("no orientation yet, nothing to persist");
            return Ok(None);
        };

        let last_timestamp = match self.last_timestamp {
            Some(timestamp) => timestamp,
            None => self
                .store
                .latest(1)
                .await?
                .first()
                .map_or(0, |record| record.timestamp),
        };
        // keep timestamps non-decreasing even if the wall clock steps back,
        // including across restarts on an existing log
        let timestamp = self.clock.now_ms().max(last_timestamp);
        let record = self
            .store
            .insert(NewOrientationRecord::new(orientation, timestamp))
            .await?;
        self.last_timestamp = Some(timestamp);
        self.revision.send_replace(record.id);
        Ok(Some(record))
    }

    /// Ticks every `period` until shutdown. A write that outlasts the period
    /// makes the missed ticks get skipped rather than queued.
    pub async fn run(
        mut self,
        period: Duration,
        policy: StoreErrorPolicy,
        mut shutdown: Shutdown,
    ) -> Result<(), StoreError> {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(Some(record)) => debug!("persisted {:?}", record),
                        Ok(None) => {}
                        Err(e) => match policy {
                            StoreErrorPolicy::LogAndContinue => warn!("failed to persist orientation: {}", e),
                            StoreErrorPolicy::Stop => {
                                error!("failed to persist orientation, stopping: {}", e);
                                return Err(e);
                            }
                        },
                    }
                }
            }
        }
        debug!("persister stopped");
        Ok(())
    }
}
