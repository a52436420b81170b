use alloc::string::ToString;
use alloc::vec;

use crate::board::{Board, PinMode};
use crate::driver::{DriverParams, SensorDriver};
use crate::error::Result;
use crate::kind::SensorKind;
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

/// PIR motion detector or relay state readback: the pin level as 0/1.
pub struct DigitalSensor {
    params: DriverParams,
}

impl DigitalSensor {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    fn measurement(&self) -> MeasurementKind {
        match self.params.kind {
            SensorKind::Relay => MeasurementKind::State,
            _ => MeasurementKind::Motion,
        }
    }
}

impl<B: Board> SensorDriver<B> for DigitalSensor {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        board.configure_pin(self.params.pin, PinMode::Input)
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        match board.digital_read(self.params.pin) {
            Ok(level) => SensorSnapshot::from_readings(
                &self.params,
                vec![Reading::new(self.measurement(), if level { 1.0 } else { 0.0 })],
            ),
            Err(e) => SensorSnapshot::failed(&self.params, e.to_string()),
        }
    }
}
