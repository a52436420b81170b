use alloc::string::String;
use alloc::vec::Vec;

use serde::{Serialize, Serializer};

use crate::driver::DriverParams;
use crate::kind::SensorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeasurementKind {
    Temperature,
    Humidity,
    Pressure,
    Light,
    Distance,
    Motion,
    State,
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "TVOC")]
    Tvoc,
    Moisture,
}

impl MeasurementKind {
    pub fn unit(self) -> &'static str {
        match self {
            MeasurementKind::Temperature => "C",
            MeasurementKind::Humidity => "%",
            MeasurementKind::Pressure => "hPa",
            MeasurementKind::Light => "lx",
            MeasurementKind::Distance => "mm",
            MeasurementKind::Motion | MeasurementKind::State => "bool",
            MeasurementKind::Co2 => "ppm",
            MeasurementKind::Tvoc => "ppb",
            MeasurementKind::Moisture => "%",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MeasurementKind::Temperature => "Temperature",
            MeasurementKind::Humidity => "Humidity",
            MeasurementKind::Pressure => "Pressure",
            MeasurementKind::Light => "Light",
            MeasurementKind::Distance => "Distance",
            MeasurementKind::Motion => "Motion",
            MeasurementKind::State => "State",
            MeasurementKind::Co2 => "CO2",
            MeasurementKind::Tvoc => "TVOC",
            MeasurementKind::Moisture => "Moisture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    #[serde(rename = "type")]
    pub kind: MeasurementKind,
    pub value: f32,
    pub unit: &'static str,
}

impl Reading {
    pub fn new(kind: MeasurementKind, value: f32) -> Self {
        Self {
            kind,
            value,
            unit: kind.unit(),
        }
    }
}

pub const AWAITING_FIRST_SAMPLE: &str = "Awaiting first sample";

/// Everything one slot produced during one cycle.
///
/// Construct through [`SensorSnapshot::from_readings`] or
/// [`SensorSnapshot::failed`]: a valid snapshot always carries readings and an
/// invalid one always carries an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub slot: usize,
    pub pin: u8,
    #[serde(rename = "sensor_type", serialize_with = "serialize_label")]
    pub kind: SensorKind,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub readings: Vec<Reading>,
}

fn serialize_label<S: Serializer>(kind: &SensorKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.label())
}

impl SensorSnapshot {
    pub fn pending(params: &DriverParams) -> Self {
        Self::failed(params, AWAITING_FIRST_SAMPLE)
    }

    pub fn from_readings(params: &DriverParams, readings: Vec<Reading>) -> Self {
        if readings.is_empty() {
            return Self::failed(params, "No readings reported");
        }

        Self {
            slot: params.slot,
            pin: params.pin,
            kind: params.kind,
            valid: true,
            error: None,
            readings,
        }
    }

    pub fn failed(params: &DriverParams, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error.push_str("Unknown error");
        }

        Self {
            slot: params.slot,
            pin: params.pin,
            kind: params.kind,
            valid: false,
            error: Some(error),
            readings: Vec::new(),
        }
    }

    pub fn value_of(&self, kind: MeasurementKind) -> Option<f32> {
        self.readings.iter().find(|r| r.kind == kind).map(|r| r.value)
    }

    /// Adds `offset` to every reading of `kind`. Call once per fresh sample.
    pub fn apply_offset(&mut self, kind: MeasurementKind, offset: f32) {
        if offset == 0.0 {
            return;
        }
        for reading in self.readings.iter_mut().filter(|r| r.kind == kind) {
            reading.value += offset;
        }
    }
}
