mod air_quality;
mod analog;
mod bosch;
mod dht;
mod digital;
mod ds18b20;
mod light;
mod proximity;
mod sht31;

pub use air_quality::{Ccs811, Scd40};
pub use analog::{AnalogSensor, AnalogTransform};
pub use bosch::{BoschCalibration, BoschSensor};
pub use dht::DhtSensor;
pub use digital::DigitalSensor;
pub use ds18b20::{DISCONNECTED_C, Ds18b20};
pub use light::{Bh1750, Tsl2561};
pub use proximity::Vl53l0x;
pub use sht31::Sht31;

use alloc::format;
use alloc::string::String;

use crate::kind::SensorKind;

/// Reported when a gated device has nothing new this cycle.
pub const NO_DATA: &str = "No data available";
pub const READ_FAILED: &str = "Read failed";

/// `Failed to read from <part> sensor`, with both DHT variants named "DHT".
pub fn read_failure(kind: SensorKind) -> String {
    let part = match kind {
        SensorKind::Dht11 | SensorKind::Dht22 => "DHT",
        other => other.label(),
    };
    format!("Failed to read from {part} sensor")
}
