use alloc::vec;

use crate::board::{Board, PinMode};
use crate::checksum;
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::read_failure;

/// Value reported for a probe that did not answer.
pub const DISCONNECTED_C: f32 = -127.0;

const SKIP_ROM: u8 = 0xCC;
const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;

// 12-bit conversion takes up to 750 ms
const CONVERSION_POLLS: u32 = 75;
const POLL_INTERVAL_MS: u32 = 10;

/// DS18B20 1-Wire temperature probe, addressed with skip-ROM (one probe per pin).
pub struct Ds18b20 {
    params: DriverParams,
}

impl Ds18b20 {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    fn reset<B: Board>(&self, board: &mut B) -> Result<()> {
        match board.one_wire_reset(self.params.pin)? {
            true => Ok(()),
            false => Err(DriverFault::NoPresencePulse),
        }
    }

    fn read_celsius<B: Board>(&self, board: &mut B) -> Result<f32> {
        let pin = self.params.pin;

        self.reset(board)?;
        board.one_wire_write(pin, SKIP_ROM)?;
        board.one_wire_write(pin, CONVERT_T)?;

        let mut done = false;
        for _ in 0..CONVERSION_POLLS {
            // The bus reads back 0 while the conversion is running.
            if board.one_wire_read(pin)? != 0 {
                done = true;
                break;
            }
            board.delay_ms(POLL_INTERVAL_MS);
        }
        if !done {
            return Err(DriverFault::Timeout);
        }

        self.reset(board)?;
        board.one_wire_write(pin, SKIP_ROM)?;
        board.one_wire_write(pin, READ_SCRATCHPAD)?;

        let mut scratchpad = [0u8; 9];
        for byte in scratchpad.iter_mut() {
            *byte = board.one_wire_read(pin)?;
        }

        if checksum::maxim(&scratchpad[..8]) != scratchpad[8] {
            return Err(DriverFault::ChecksumMismatch);
        }

        Ok(i16::from_le_bytes([scratchpad[0], scratchpad[1]]) as f32 / 16.0)
    }

    /// Celsius, or [`DISCONNECTED_C`].
    fn temperature<B: Board>(&self, board: &mut B) -> f32 {
        self.read_celsius(board).unwrap_or_else(|e| {
            log::debug!("DS18B20 on pin {}: {}", self.params.pin, e);
            DISCONNECTED_C
        })
    }
}

impl<B: Board> SensorDriver<B> for Ds18b20 {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        board.configure_pin(self.params.pin, PinMode::InputPullUp)?;
        self.reset(board)
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let temperature = self.temperature(board);

        if temperature == DISCONNECTED_C {
            return SensorSnapshot::failed(&self.params, read_failure(self.params.kind));
        }

        SensorSnapshot::from_readings(
            &self.params,
            vec![Reading::new(MeasurementKind::Temperature, temperature)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SensorKind;
    use crate::mock::{MockBoard, ds18b20_scratchpad};

    fn params() -> DriverParams {
        DriverParams::new(3, SensorKind::Ds18b20, 15, 0)
    }

    #[test]
    fn test_reads_scratchpad() {
        // 0x0191 = 25.0625 C
        let mut board = MockBoard::new().with_one_wire(15, ds18b20_scratchpad(0x0191));
        let mut sensor = Ds18b20::new(params());

        sensor.initialize(&mut board).unwrap();
        let snapshot = sensor.sample(&mut board);

        assert!(snapshot.valid);
        assert_eq!(snapshot.value_of(MeasurementKind::Temperature), Some(25.0625));
    }

    #[test]
    fn test_negative_temperature() {
        // 0xFF5E = -10.125 C
        let mut board = MockBoard::new().with_one_wire(15, ds18b20_scratchpad(-162));
        let mut sensor = Ds18b20::new(params());

        let snapshot = sensor.sample(&mut board);

        assert_eq!(snapshot.value_of(MeasurementKind::Temperature), Some(-10.125));
    }

    #[test]
    fn test_disconnected_probe_uses_sentinel() {
        let mut board = MockBoard::new();
        let mut sensor = Ds18b20::new(params());

        assert_eq!(sensor.initialize(&mut board), Err(DriverFault::NoPresencePulse));
        assert_eq!(sensor.temperature(&mut board), DISCONNECTED_C);

        let snapshot = sensor.sample(&mut board);
        assert!(!snapshot.valid);
        assert_eq!(snapshot.error.as_deref(), Some("Failed to read from DS18B20 sensor"));
    }

    #[test]
    fn test_corrupt_scratchpad_is_invalid() {
        let mut scratchpad = ds18b20_scratchpad(0x0191);
        scratchpad[8] ^= 0xFF;
        let mut board = MockBoard::new().with_one_wire(15, scratchpad);
        let mut sensor = Ds18b20::new(params());

        assert!(!sensor.sample(&mut board).valid);
    }
}
