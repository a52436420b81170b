use embedded_hal::i2c::I2c;

use crate::error::{DriverFault, Result};

/// Resolution and reference of the analog front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcProfile {
    /// Full-scale count, e.g. 4095 for a 12-bit converter
    pub max_counts: u16,
    /// Voltage at full scale (millivolts)
    pub reference_mv: f32,
}

impl AdcProfile {
    pub const ESP32: AdcProfile = AdcProfile {
        max_counts: 4095,
        reference_mv: 3300.0,
    };

    pub const ESP8266: AdcProfile = AdcProfile {
        max_counts: 1024,
        reference_mv: 1000.0,
    };

    pub fn millivolts(&self, raw: u16) -> f32 {
        raw as f32 * self.reference_mv / self.max_counts as f32
    }
}

impl Default for AdcProfile {
    fn default() -> Self {
        AdcProfile::ESP32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullUp,
    Output,
}

/// The hardware surface a driver may touch.
///
/// One board instance owns the shared I2C bus; drivers borrow it only for
/// the duration of `initialize`/`sample`, which keeps every bus transaction
/// on the acquisition loop. Timing-critical single-wire protocols are
/// delegated to the board, which knows how to bit-bang them on its target:
/// drivers only see decoded bytes.
///
/// All capabilities except I2C and delays default to
/// [`DriverFault::Unsupported`].
pub trait Board {
    type I2c: I2c;

    fn i2c(&mut self) -> &mut Self::I2c;

    fn delay_ms(&mut self, ms: u32);

    fn adc_profile(&self) -> AdcProfile {
        AdcProfile::default()
    }

    fn configure_pin(&mut self, _pin: u8, _mode: PinMode) -> Result<()> {
        Ok(())
    }

    fn analog_read(&mut self, _pin: u8) -> Result<u16> {
        Err(DriverFault::Unsupported)
    }

    fn digital_read(&mut self, _pin: u8) -> Result<bool> {
        Err(DriverFault::Unsupported)
    }

    /// Runs the DHT start sequence on `pin` and returns the raw 40-bit frame.
    fn read_dht_frame(&mut self, _pin: u8) -> Result<[u8; 5]> {
        Err(DriverFault::Unsupported)
    }

    /// Issues a 1-Wire reset; `true` when a presence pulse was seen.
    fn one_wire_reset(&mut self, _pin: u8) -> Result<bool> {
        Err(DriverFault::Unsupported)
    }

    fn one_wire_write(&mut self, _pin: u8, _byte: u8) -> Result<()> {
        Err(DriverFault::Unsupported)
    }

    fn one_wire_read(&mut self, _pin: u8) -> Result<u8> {
        Err(DriverFault::Unsupported)
    }
}
