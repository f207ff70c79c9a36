use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{trace, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::clock::Clock;

use super::{SensorEvent, SensorKind, SensorSource};

/// Reads `A,x,y,z` / `M,x,y,z` lines, one sample per line.
pub struct SerialSensorSource<R: AsyncBufRead + Unpin + Send> {
    reader: R,
    clock: Arc<dyn Clock>,
    line: String,
}

const AVAILABLE: [SensorKind; 2] = [SensorKind::Accelerometer, SensorKind::Magnetometer];

pub fn create_serial_source(
    serial_port_name: String,
    baud_rate: u32,
    clock: Arc<dyn Clock>,
) -> Result<SerialSensorSource<BufReader<SerialStream>>> {
    let serial: SerialStream = tokio_serial::new(serial_port_name, baud_rate).open_native_async()?;
    Ok(SerialSensorSource::new(BufReader::new(serial), clock))
}

impl<R: AsyncBufRead + Unpin + Send> SerialSensorSource<R> {
    pub fn new(reader: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            reader,
            clock,
            line: String::new(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum LineError {
    UnknownSensor,
    WrongFieldCount(usize),
    BadNumber,
}

/// Parses one line of the serial protocol. Blank lines give `Ok(None)`.
pub fn parse_sensor_line(line: &str, timestamp_ms: u64) -> Result<Option<SensorEvent>, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split(',').map(str::trim);
    let kind = match fields.next() {
        Some("A") => SensorKind::Accelerometer,
        Some("M") => SensorKind::Magnetometer,
        _ => return Err(LineError::UnknownSensor),
    };

    let numbers = fields.collect::<Vec<_>>();
    let values = match numbers.len() {
        0 => None,
        3 => {
            let mut values = [0f32; 3];
            for (value, text) in values.iter_mut().zip(numbers) {
                *value = text.parse().map_err(|_| LineError::BadNumber)?;
                if !value.is_finite() {
                    return Err(LineError::BadNumber);
                }
            }
            Some(values)
        }
        n => return Err(LineError::WrongFieldCount(n)),
    };

    Ok(Some(SensorEvent {
        kind,
        timestamp_ms,
        values,
    }))
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> SensorSource for SerialSensorSource<R> {
    fn available(&self) -> &[SensorKind] {
        &AVAILABLE
    }

    async fn next_event(&mut self) -> Result<Option<SensorEvent>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }
            trace!("serial line: {:?}", self.line);

            match parse_sensor_line(&self.line, self.clock.now_ms()) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) => warn!("skipping serial line {:?}: {:?}", self.line.trim(), e),
            }
        }
    }
}
