mod serial;
mod simulated;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use nalgebra::Vector3;
use tokio::sync::watch;

use crate::shutdown::Shutdown;

pub use serial::{create_serial_source, parse_sensor_line, SerialSensorSource};
pub use simulated::SimulatedSensorSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
}

/// How often a source is asked to deliver samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingRate {
    Normal,
    Ui,
    #[default]
    Game,
    Fastest,
}

impl SamplingRate {
    pub fn period(&self) -> Duration {
        match self {
            SamplingRate::Normal => Duration::from_micros(200_000),
            SamplingRate::Ui => Duration::from_micros(66_667),
            SamplingRate::Game => Duration::from_micros(20_000),
            SamplingRate::Fastest => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorKind,
    pub timestamp_ms: u64,
    /// `None` for a null event, which is ignored
    pub values: Option<[f32; 3]>,
}

/// Latest raw vector of one sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub timestamp_ms: u64,
    pub values: [f32; 3],
}

impl SensorSample {
    pub fn vector(&self) -> Vector3<f32> {
        Vector3::from(self.values)
    }
}

#[async_trait]
pub trait SensorSource: Send {
    fn available(&self) -> &[SensorKind];

    /// Returns Ok(None) when the source has no more events
    async fn next_event(&mut self) -> Result<Option<SensorEvent>>;
}

pub type SampleSlot = watch::Receiver<Option<SensorSample>>;

/// Buffers the latest sample of each sensor. A slot holding `Some` means that
/// sensor is ready.
pub struct SensorReader {
    accelerometer: watch::Sender<Option<SensorSample>>,
    magnetometer: watch::Sender<Option<SensorSample>>,
}

impl SensorReader {
    pub fn new() -> Self {
        let (accelerometer, _) = watch::channel(None);
        let (magnetometer, _) = watch::channel(None);
        Self {
            accelerometer,
            magnetometer,
        }
    }

    pub fn subscribe(&self, kind: SensorKind) -> SampleSlot {
        self.slot(kind).subscribe()
    }

    pub fn latest(&self, kind: SensorKind) -> Option<SensorSample> {
        *self.slot(kind).borrow()
    }

    pub fn is_ready(&self, kind: SensorKind) -> bool {
        self.latest(kind).is_some()
    }

    fn slot(&self, kind: SensorKind) -> &watch::Sender<Option<SensorSample>> {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    /// Copies one event into its slot, null events are dropped.
    pub fn handle_event(&self, event: SensorEvent) {
        if let Some(values) = event.values {
            self.slot(event.kind).send_replace(Some(SensorSample {
                timestamp_ms: event.timestamp_ms,
                values,
            }));
        }
    }

    pub async fn run(&self, mut source: Box<dyn SensorSource>, mut shutdown: Shutdown) -> Result<()> {
        for kind in [SensorKind::Accelerometer, SensorKind::Magnetometer] {
            if !source.available().contains(&kind) {
                warn!("{:?} not available, orientation will not be estimated", kind);
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    debug!("sensor reader stopped");
                    return Ok(());
                }
                event = source.next_event() => {
                    match event? {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("sensor source ended");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

impl Default for SensorReader {
    fn default() -> Self {
        Self::new()
    }
}
