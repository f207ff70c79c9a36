use std::{sync::Arc, time::SystemTime};

use anyhow::Result;
use log::info;
use orientation_host_lib::{
    sensor::{create_serial_source, SimulatedSensorSource},
    Clock, SensorSource, SessionConfig,
};

pub fn create_source(
    serial_port_name: Option<String>,
    baud_rate: u32,
    with_magnetometer: bool,
    config: &SessionConfig,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn SensorSource>> {
    match serial_port_name {
        Some(serial_port_name) => {
            info!("reading sensors from {} at {} baud", serial_port_name, baud_rate);
            Ok(Box::new(create_serial_source(serial_port_name, baud_rate, clock)?))
        }
        None => {
            let seed = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            info!(
                "using simulated sensors{}",
                if with_magnetometer { "" } else { " without magnetometer" }
            );
            Ok(Box::new(SimulatedSensorSource::new(
                clock,
                config.sampling_rate,
                with_magnetometer,
                seed,
            )))
        }
    }
}
