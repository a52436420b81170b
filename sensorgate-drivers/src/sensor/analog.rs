use alloc::string::ToString;
use alloc::vec;

use crate::board::{AdcProfile, Board, PinMode};
use crate::driver::{DriverParams, SensorDriver};
use crate::error::Result;
use crate::kind::SensorKind;
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

/// Maps raw ADC counts to a physical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalogTransform {
    /// 10 mV/°C, 0 V at 0 °C
    Lm35,
    /// 10 mV/°C with a 500 mV offset
    Tmp36,
    /// Capacitive probe: full scale is bone dry
    SoilMoisture,
}

impl AnalogTransform {
    pub fn for_kind(kind: SensorKind) -> Option<Self> {
        match kind {
            SensorKind::Lm35 => Some(AnalogTransform::Lm35),
            SensorKind::Tmp36 => Some(AnalogTransform::Tmp36),
            SensorKind::SoilMoisture => Some(AnalogTransform::SoilMoisture),
            _ => None,
        }
    }

    pub fn measurement(self) -> MeasurementKind {
        match self {
            AnalogTransform::Lm35 | AnalogTransform::Tmp36 => MeasurementKind::Temperature,
            AnalogTransform::SoilMoisture => MeasurementKind::Moisture,
        }
    }

    pub fn apply(self, raw: u16, adc: AdcProfile) -> f32 {
        match self {
            AnalogTransform::Lm35 => adc.millivolts(raw) / 10.0,
            AnalogTransform::Tmp36 => (adc.millivolts(raw) - 500.0) / 10.0,
            AnalogTransform::SoilMoisture => 100.0 - raw as f32 * 100.0 / adc.max_counts as f32,
        }
    }
}

/// LM35, TMP36 and soil moisture probes on an ADC pin.
///
/// There is no way to tell a floating pin from a real reading, so these are
/// always reported valid unless the board itself refuses the read.
pub struct AnalogSensor {
    params: DriverParams,
    transform: AnalogTransform,
}

impl AnalogSensor {
    pub fn new(params: DriverParams) -> Self {
        Self {
            transform: AnalogTransform::for_kind(params.kind).unwrap_or(AnalogTransform::Lm35),
            params,
        }
    }
}

impl<B: Board> SensorDriver<B> for AnalogSensor {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        board.configure_pin(self.params.pin, PinMode::Input)
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let adc = board.adc_profile();

        match board.analog_read(self.params.pin) {
            Ok(raw) => SensorSnapshot::from_readings(
                &self.params,
                vec![Reading::new(
                    self.transform.measurement(),
                    self.transform.apply(raw, adc),
                )],
            ),
            Err(e) => SensorSnapshot::failed(&self.params, e.to_string()),
        }
    }
}
