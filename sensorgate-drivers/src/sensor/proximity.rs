use alloc::vec;

use crate::board::Board;
use crate::bus::{read_register, read_registers, write_bytes};
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::READ_FAILED;

const SYSRANGE_START: u8 = 0x00;
const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
const RESULT_INTERRUPT_STATUS: u8 = 0x13;
const RESULT_RANGE_STATUS: u8 = 0x14;
const IDENTIFICATION_MODEL_ID: u8 = 0xC0;

const MODEL_ID: u8 = 0xEE;
const DEVICE_STATUS_RANGE_COMPLETE: u8 = 11;
/// Device status codes the ST API folds into "phase fail". Other
/// non-complete codes (signal, sigma, min range) still carry a distance.
const DEVICE_STATUS_PHASE_FAIL: [u8; 2] = [6, 9];

const RANGING_POLLS: u32 = 20;

/// VL53L0X time-of-flight ranging in single-shot mode.
pub struct Vl53l0x {
    params: DriverParams,
}

impl Vl53l0x {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    /// Returns `(device range status, distance mm)`.
    fn range<B: Board>(&self, board: &mut B) -> Result<(u8, u16)> {
        let address = self.params.address;

        write_bytes(board, address, &[SYSRANGE_START, 0x01])?;

        let mut ready = false;
        for _ in 0..RANGING_POLLS {
            board.delay_ms(5);
            if read_register(board, address, RESULT_INTERRUPT_STATUS)? & 0x07 != 0 {
                ready = true;
                break;
            }
        }
        if !ready {
            return Err(DriverFault::Timeout);
        }

        let mut result = [0u8; 12];
        read_registers(board, address, RESULT_RANGE_STATUS, &mut result)?;
        write_bytes(board, address, &[SYSTEM_INTERRUPT_CLEAR, 0x01])?;

        let status = (result[0] & 0x78) >> 3;
        let distance = u16::from_be_bytes([result[10], result[11]]);

        Ok((status, distance))
    }
}

impl<B: Board> SensorDriver<B> for Vl53l0x {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        let address = self.params.address;

        let id = read_register(board, address, IDENTIFICATION_MODEL_ID)?;
        if id != MODEL_ID {
            return Err(DriverFault::UnexpectedDevice { address, id });
        }

        Ok(())
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        match self.range(board) {
            Ok((status, _)) if DEVICE_STATUS_PHASE_FAIL.contains(&status) => {
                log::debug!("VL53L0X phase fail, range status {}", status);
                SensorSnapshot::failed(&self.params, READ_FAILED)
            }
            Ok((status, distance)) => {
                if status != DEVICE_STATUS_RANGE_COMPLETE {
                    log::trace!("VL53L0X range status {}", status);
                }
                SensorSnapshot::from_readings(
                    &self.params,
                    vec![Reading::new(MeasurementKind::Distance, distance as f32)],
                )
            }
            Err(e) => {
                log::debug!("VL53L0X at 0x{:02X}: {}", self.params.address, e);
                SensorSnapshot::failed(&self.params, READ_FAILED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SensorKind;
    use crate::mock::{MockBoard, RegisterDevice};

    fn device(status: u8, distance: u16) -> RegisterDevice {
        let mut result = [0u8; 12];
        result[0] = status << 3;
        result[10..12].copy_from_slice(&distance.to_be_bytes());

        RegisterDevice::new(0x29)
            .with_register(IDENTIFICATION_MODEL_ID, MODEL_ID)
            .with_register(RESULT_INTERRUPT_STATUS, 0x04)
            .with_registers(RESULT_RANGE_STATUS, &result)
    }

    fn params() -> DriverParams {
        DriverParams::new(0, SensorKind::Vl53l0x, 0, 0)
    }

    #[test]
    fn test_range_complete() {
        let mut board = MockBoard::new().with_device(device(DEVICE_STATUS_RANGE_COMPLETE, 245));
        let mut sensor = Vl53l0x::new(params());

        sensor.initialize(&mut board).unwrap();
        let snapshot = sensor.sample(&mut board);

        assert!(snapshot.valid);
        assert_eq!(snapshot.value_of(MeasurementKind::Distance), Some(245.0));
        assert_eq!(snapshot.readings[0].unit, "mm");
    }

    #[test]
    fn test_phase_failure_is_invalid() {
        for status in DEVICE_STATUS_PHASE_FAIL {
            let mut board = MockBoard::new().with_device(device(status, 8190));
            let mut sensor = Vl53l0x::new(params());

            let snapshot = sensor.sample(&mut board);

            assert!(!snapshot.valid, "{status}");
            assert_eq!(snapshot.error.as_deref(), Some("Read failed"));
        }
    }

    #[test]
    fn test_weak_signal_still_reports() {
        // 4 is a signal failure, 8 a minimum-range failure.
        for status in [4, 8] {
            let mut board = MockBoard::new().with_device(device(status, 1200));
            let mut sensor = Vl53l0x::new(params());

            let snapshot = sensor.sample(&mut board);

            assert!(snapshot.valid, "{status}");
            assert_eq!(snapshot.value_of(MeasurementKind::Distance), Some(1200.0));
        }
    }

    #[test]
    fn test_ranging_timeout() {
        let mut board = MockBoard::new().with_device(
            device(DEVICE_STATUS_RANGE_COMPLETE, 245).with_register(RESULT_INTERRUPT_STATUS, 0),
        );
        let mut sensor = Vl53l0x::new(params());

        assert_eq!(sensor.range(&mut board), Err(DriverFault::Timeout));
    }
}
