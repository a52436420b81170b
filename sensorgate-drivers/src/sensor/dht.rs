use alloc::vec;

use crate::board::{Board, PinMode};
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::kind::SensorKind;
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::read_failure;

/// DHT11/DHT22 single-wire humidity and temperature sensor.
pub struct DhtSensor {
    params: DriverParams,
}

impl DhtSensor {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    /// Returns `(temperature, humidity)`, NaN on any failure.
    fn read<B: Board>(&self, board: &mut B) -> (f32, f32) {
        match board
            .read_dht_frame(self.params.pin)
            .and_then(|frame| decode(self.params.kind, frame))
        {
            Ok(values) => values,
            Err(e) => {
                log::debug!("DHT read on pin {} failed: {}", self.params.pin, e);
                (f32::NAN, f32::NAN)
            }
        }
    }
}

fn decode(kind: SensorKind, frame: [u8; 5]) -> Result<(f32, f32)> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(DriverFault::ChecksumMismatch);
    }

    let (temperature, humidity) = match kind {
        SensorKind::Dht11 => {
            let humidity = frame[0] as f32 + frame[1] as f32 * 0.1;
            let mut temperature = frame[2] as f32 + (frame[3] & 0x0F) as f32 * 0.1;
            if frame[3] & 0x80 != 0 {
                temperature = -temperature;
            }
            (temperature, humidity)
        }
        _ => {
            let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 * 0.1;
            let mut temperature = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as f32 * 0.1;
            if frame[2] & 0x80 != 0 {
                temperature = -temperature;
            }
            (temperature, humidity)
        }
    };

    Ok((temperature, humidity))
}

impl<B: Board> SensorDriver<B> for DhtSensor {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        board.configure_pin(self.params.pin, PinMode::InputPullUp)
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let (temperature, humidity) = self.read(board);

        if temperature.is_nan() || humidity.is_nan() {
            return SensorSnapshot::failed(&self.params, read_failure(self.params.kind));
        }

        SensorSnapshot::from_readings(
            &self.params,
            vec![
                Reading::new(MeasurementKind::Temperature, temperature),
                Reading::new(MeasurementKind::Humidity, humidity),
            ],
        )
    }
}
