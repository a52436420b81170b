use alloc::boxed::Box;

use crate::board::Board;
use crate::error::Result;
use crate::kind::SensorKind;
use crate::sensor::{
    AnalogSensor, Bh1750, BoschSensor, Ccs811, DhtSensor, DigitalSensor, Ds18b20, Scd40,
    Sht31, Tsl2561, Vl53l0x,
};
use crate::types::SensorSnapshot;

/// Static wiring of one configured slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverParams {
    pub slot: usize,
    pub kind: SensorKind,
    pub pin: u8,
    /// Resolved I2C address; 0 for kinds not on the bus
    pub address: u8,
}

impl DriverParams {
    /// An `address` of 0 selects the kind's default address.
    pub fn new(slot: usize, kind: SensorKind, pin: u8, address: u8) -> Self {
        let address = match (address, kind.default_address()) {
            (0, Some(default)) => default,
            (_, None) => 0,
            (address, Some(_)) => address,
        };

        Self {
            slot,
            kind,
            pin,
            address,
        }
    }
}

/// One physical sensor.
///
/// `sample` never fails: faults are reported through an invalid snapshot so
/// a broken slot cannot abort the sweep.
pub trait SensorDriver<B: Board> {
    fn params(&self) -> &DriverParams;

    fn initialize(&mut self, board: &mut B) -> Result<()>;

    fn sample(&mut self, board: &mut B) -> SensorSnapshot;
}

/// Builds the driver for `params.kind`, or `None` for an empty slot.
pub fn instantiate<B: Board>(params: DriverParams) -> Option<Box<dyn SensorDriver<B>>> {
    let driver: Box<dyn SensorDriver<B>> = match params.kind {
        SensorKind::None => return None,
        SensorKind::Dht11 | SensorKind::Dht22 => Box::new(DhtSensor::new(params)),
        SensorKind::Bme280 | SensorKind::Bmp280 => Box::new(BoschSensor::new(params)),
        SensorKind::Sht31 => Box::new(Sht31::new(params)),
        SensorKind::Ds18b20 => Box::new(Ds18b20::new(params)),
        SensorKind::Lm35 | SensorKind::Tmp36 | SensorKind::SoilMoisture => {
            Box::new(AnalogSensor::new(params))
        }
        SensorKind::Pir | SensorKind::Relay => Box::new(DigitalSensor::new(params)),
        SensorKind::Ccs811 => Box::new(Ccs811::new(params)),
        SensorKind::Scd40 => Box::new(Scd40::new(params)),
        SensorKind::Bh1750 => Box::new(Bh1750::new(params)),
        SensorKind::Tsl2561 => Box::new(Tsl2561::new(params)),
        SensorKind::Vl53l0x => Box::new(Vl53l0x::new(params)),
    };

    Some(driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBoard;

    #[test]
    fn test_zero_address_resolves_to_default() {
        let params = DriverParams::new(1, SensorKind::Bme280, 5, 0);
        assert_eq!(params.address, 0x76);

        let params = DriverParams::new(1, SensorKind::Bme280, 5, 0x77);
        assert_eq!(params.address, 0x77);

        let params = DriverParams::new(0, SensorKind::Dht22, 4, 0x40);
        assert_eq!(params.address, 0);
    }

    #[test]
    fn test_every_kind_but_none_has_driver() {
        for (slot, kind) in SensorKind::ALL.into_iter().enumerate() {
            let driver = instantiate::<MockBoard>(DriverParams::new(slot, kind, 4, 0));

            match kind {
                SensorKind::None => assert!(driver.is_none()),
                _ => assert_eq!(driver.unwrap().params().kind, kind),
            }
        }
    }
}
