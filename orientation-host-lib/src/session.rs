use std::sync::Arc;

use log::{error, info};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    clock::Clock,
    config::SessionConfig,
    orientation::{Orientation, OrientationEstimator},
    persister::Persister,
    query::QueryService,
    sensor::{SensorKind, SensorReader, SensorSource},
    shutdown::{shutdown_channel, ShutdownTrigger},
    store::OrientationStore,
};

/// Owns the sampling, estimation and persistence tasks. Dropping the session
/// without calling `shutdown` also stops them, but does not wait.
pub struct OrientationSession {
    shutdown: ShutdownTrigger,
    tasks: Vec<JoinHandle<()>>,
    orientation: watch::Receiver<Option<Orientation>>,
    query: QueryService,
}

impl OrientationSession {
    /// Spawns the background tasks on the current tokio runtime.
    pub fn start(
        config: &SessionConfig,
        source: Box<dyn SensorSource>,
        store: Arc<dyn OrientationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown, shutdown_rx) = shutdown_channel();
        let reader = Arc::new(SensorReader::new());
        let (orientation_tx, orientation) = watch::channel(None);

        let persister = Persister::new(store.clone(), orientation.clone(), clock);
        let query = QueryService::new(store, persister.subscribe_revision());

        let mut tasks = Vec::new();

        {
            let reader = reader.clone();
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = reader.run(source, shutdown).await {
                    error!("sensor reader failed: {:?}", e);
                }
            }));
        }

        {
            let estimator = OrientationEstimator::new(config.axis_remap);
            let accel = reader.subscribe(SensorKind::Accelerometer);
            let mag = reader.subscribe(SensorKind::Magnetometer);
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                estimator.run(accel, mag, orientation_tx, shutdown).await;
            }));
        }

        {
            let period = config.save_interval;
            let policy = config.on_store_error;
            let shutdown = shutdown_rx;
            tasks.push(tokio::spawn(async move {
                if let Err(e) = persister.run(period, policy, shutdown).await {
                    error!("persister stopped on storage error: {}", e);
                }
            }));
        }

        info!(
            "orientation session started, saving every {:?}",
            config.save_interval
        );
        Self {
            shutdown,
            tasks,
            orientation,
            query,
        }
    }

    pub fn query(&self) -> QueryService {
        self.query.clone()
    }

    pub fn current_orientation(&self) -> watch::Receiver<Option<Orientation>> {
        self.orientation.clone()
    }

    /// Stops every task and waits for them. No record is written after this
    /// returns.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("session task panicked: {:?}", e);
            }
        }
        info!("orientation session stopped");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        clock::ManualClock,
        sensor::{SamplingRate, SimulatedSensorSource},
        store::MemoryStore,
    };
    use futures_util::{pin_mut, StreamExt};
    use std::time::Duration;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            sampling_rate: SamplingRate::Game,
            save_interval: Duration::from_millis(50),
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn persists_while_running_and_nothing_after_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let config = fast_config();
        let source = SimulatedSensorSource::new(clock.clone(), config.sampling_rate, true, 1);
        let session = OrientationSession::start(&config, Box::new(source), store.clone(), clock);

        let feed = session.query().latest_feed();
        pin_mut!(feed);
        let mut seen = 0;
        while seen < 3 {
            let latest = tokio::time::timeout(Duration::from_secs(5), feed.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            seen = latest.len();
        }
        assert!(session.current_orientation().borrow().is_some());

        session.shutdown().await;
        let count = store.count().await.unwrap();
        assert!(count >= 3);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.count().await.unwrap(), count);
    }

    #[tokio::test]
    async fn missing_magnetometer_never_persists() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let config = fast_config();
        let source = SimulatedSensorSource::new(clock.clone(), config.sampling_rate, false, 1);
        let session = OrientationSession::start(&config, Box::new(source), store.clone(), clock);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(session.current_orientation().borrow().is_none());
        session.shutdown().await;
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
