use std::{f32::consts::PI, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use nalgebra::{Rotation3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::clock::Clock;

use super::{SamplingRate, SensorEvent, SensorKind, SensorSource};

const GRAVITY: f32 = 9.81; // m/s^2
const FIELD_HORIZONTAL: f32 = 20.0; // uT, towards north
const FIELD_VERTICAL: f32 = 45.0; // uT, downwards
const YAW_RATE: f32 = 10.0; // deg/s
const WOBBLE_AMPLITUDE: f32 = 5.0; // deg
const ACCEL_NOISE: f32 = 0.05;
const MAG_NOISE: f32 = 0.3;

/// Synthesizes a device held upright, screen towards the user, turning on the
/// spot with a small pitch and roll wobble.
pub struct SimulatedSensorSource {
    clock: Arc<dyn Clock>,
    available: Vec<SensorKind>,
    ticker: Option<Interval>,
    rng: StdRng,
    elapsed_s: f32,
    period_s: f32,
    pending_mag: Option<SensorEvent>,
}

impl SimulatedSensorSource {
    pub fn new(clock: Arc<dyn Clock>, rate: SamplingRate, with_magnetometer: bool, seed: u64) -> Self {
        let mut available = vec![SensorKind::Accelerometer];
        if with_magnetometer {
            available.push(SensorKind::Magnetometer);
        }
        // fastest still needs a pace for a synthetic source
        let period = if rate.period().is_zero() {
            SamplingRate::Game.period()
        } else {
            rate.period()
        };
        Self {
            clock,
            available,
            ticker: None,
            rng: StdRng::seed_from_u64(seed),
            elapsed_s: 0.0,
            period_s: period.as_secs_f32(),
            pending_mag: None,
        }
    }

    /// Gravity and geomagnetic vectors in the device frame after `elapsed_s`.
    pub fn sample_at(elapsed_s: f32) -> (Vector3<f32>, Vector3<f32>) {
        let yaw = (YAW_RATE * elapsed_s).to_radians();
        let wobble = (WOBBLE_AMPLITUDE * (elapsed_s * 0.5).sin()).to_radians();

        // world frame is east, north, up; device upright means its y axis
        // points up and its back (-z) points north at yaw 0
        let upright = Rotation3::from_axis_angle(&Vector3::x_axis(), PI / 2.0);
        let heading = Rotation3::from_axis_angle(&Vector3::z_axis(), -yaw);
        let tilt = Rotation3::from_euler_angles(wobble, 0.0, wobble * 0.5);
        let device_to_world = heading * upright * tilt;

        let gravity_world = Vector3::new(0.0, 0.0, GRAVITY);
        let field_world = Vector3::new(0.0, FIELD_HORIZONTAL, -FIELD_VERTICAL);
        let world_to_device = device_to_world.inverse();
        (world_to_device * gravity_world, world_to_device * field_world)
    }

    fn noisy(&mut self, v: Vector3<f32>, amplitude: f32) -> [f32; 3] {
        [
            v.x + self.rng.gen_range(-amplitude..=amplitude),
            v.y + self.rng.gen_range(-amplitude..=amplitude),
            v.z + self.rng.gen_range(-amplitude..=amplitude),
        ]
    }
}

#[async_trait]
impl SensorSource for SimulatedSensorSource {
    fn available(&self) -> &[SensorKind] {
        &self.available
    }

    async fn next_event(&mut self) -> Result<Option<SensorEvent>> {
        if let Some(event) = self.pending_mag.take() {
            return Ok(Some(event));
        }

        let period_s = self.period_s;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(std::time::Duration::from_secs_f32(period_s));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        ticker.tick().await;

        let timestamp_ms = self.clock.now_ms();
        let (gravity, field) = Self::sample_at(self.elapsed_s);
        self.elapsed_s += self.period_s;

        if self.available.contains(&SensorKind::Magnetometer) {
            let values = self.noisy(field, MAG_NOISE);
            self.pending_mag = Some(SensorEvent {
                kind: SensorKind::Magnetometer,
                timestamp_ms,
                values: Some(values),
            });
        }
        let values = self.noisy(gravity, ACCEL_NOISE);
        Ok(Some(SensorEvent {
            kind: SensorKind::Accelerometer,
            timestamp_ms,
            values: Some(values),
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{clock::ManualClock, orientation::OrientationEstimator};
    use approx::assert_relative_eq;

    #[test]
    fn synthetic_vectors_match_estimator_convention() {
        let estimator = OrientationEstimator::default();
        let (gravity, field) = SimulatedSensorSource::sample_at(0.0);
        let orientation = estimator.estimate(&gravity, &field).unwrap();
        assert_relative_eq!(orientation.yaw, 0.0, epsilon = 0.01);
        assert_relative_eq!(orientation.pitch, 0.0, epsilon = 0.01);
        assert_relative_eq!(orientation.roll, 0.0, epsilon = 0.01);

        // wobble is back at zero at t = 2*pi
        let t = 2.0 * PI;
        let (gravity, field) = SimulatedSensorSource::sample_at(t);
        let orientation = estimator.estimate(&gravity, &field).unwrap();
        assert_relative_eq!(orientation.yaw, YAW_RATE * t, epsilon = 0.1);
    }

    #[tokio::test]
    async fn emits_accelerometer_then_magnetometer() {
        let clock = Arc::new(ManualClock::new(42));
        let mut source = SimulatedSensorSource::new(clock, SamplingRate::Fastest, true, 7);
        let first = source.next_event().await.unwrap().unwrap();
        let second = source.next_event().await.unwrap().unwrap();
        assert_eq!(first.kind, SensorKind::Accelerometer);
        assert_eq!(second.kind, SensorKind::Magnetometer);
        assert_eq!(first.timestamp_ms, 42);
        assert!(first.values.is_some());
    }

    #[tokio::test]
    async fn without_magnetometer_only_accelerometer() {
        let clock = Arc::new(ManualClock::new(0));
        let mut source = SimulatedSensorSource::new(clock, SamplingRate::Fastest, false, 7);
        assert_eq!(source.available(), &[SensorKind::Accelerometer]);
        for _ in 0..4 {
            let event = source.next_event().await.unwrap().unwrap();
            assert_eq!(event.kind, SensorKind::Accelerometer);
        }
    }
}
