mod rotation;

use log::{debug, trace};
use nalgebra::Vector3;
use tokio::sync::watch;

use crate::{config::AXIS_REMAP, sensor::SampleSlot, shutdown::Shutdown};

pub use rotation::{orientation_angles, remap_coordinate_system, rotation_matrix, Axis};

/// Roll, pitch and yaw in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct OrientationEstimator {
    remap: (Axis, Axis),
}

impl Default for OrientationEstimator {
    fn default() -> Self {
        Self { remap: AXIS_REMAP }
    }
}

impl OrientationEstimator {
    pub fn new(remap: (Axis, Axis)) -> Self {
        Self { remap }
    }

    /// `None` if the samples don't define an orientation (free fall, field
    /// parallel to gravity) or the remap is invalid.
    pub fn estimate(&self, accel: &Vector3<f32>, mag: &Vector3<f32>) -> Option<Orientation> {
        let r = rotation_matrix(accel, mag)?;
        let r = remap_coordinate_system(&r, self.remap.0, self.remap.1)?;
        let (azimuth, pitch, roll) = orientation_angles(&r);
        Some(Orientation {
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
            yaw: azimuth.to_degrees(),
        })
    }

    /// Re-estimates whenever either sample slot changes and publishes the
    /// result. Degenerate samples keep the previous orientation.
    pub async fn run(
        &self,
        mut accel: SampleSlot,
        mut mag: SampleSlot,
        orientation: watch::Sender<Option<Orientation>>,
        mut shutdown: Shutdown,
    ) {
        loop {
            let accel_sample = *accel.borrow_and_update();
            let mag_sample = *mag.borrow_and_update();
            if let (Some(a), Some(m)) = (accel_sample, mag_sample) {
                match self.estimate(&a.vector(), &m.vector()) {
                    Some(estimate) => {
                        trace!("orientation {:?}", estimate);
                        orientation.send_replace(Some(estimate));
                    }
                    None => trace!("degenerate sample pair, keeping last orientation"),
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                changed = accel.changed() => if changed.is_err() { break },
                changed = mag.changed() => if changed.is_err() { break },
            }
        }
        debug!("orientation estimator stopped");
    }
}
