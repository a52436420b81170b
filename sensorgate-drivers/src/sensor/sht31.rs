use alloc::vec;

use crate::board::Board;
use crate::bus::{read_bytes, write_bytes};
use crate::checksum::sensirion_word;
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::read_failure;

const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];
const CMD_READ_STATUS: [u8; 2] = [0xF3, 0x2D];
/// Single shot, high repeatability, clock stretching disabled.
const CMD_MEASURE_HIGH: [u8; 2] = [0x24, 0x00];

pub struct Sht31 {
    params: DriverParams,
}

impl Sht31 {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    fn measure<B: Board>(&self, board: &mut B) -> Result<(f32, f32)> {
        let address = self.params.address;

        write_bytes(board, address, &CMD_MEASURE_HIGH)?;
        board.delay_ms(16);

        let mut data = [0u8; 6];
        read_bytes(board, address, &mut data)?;

        let raw_t = sensirion_word(&data[0..3]).ok_or(DriverFault::ChecksumMismatch)?;
        let raw_h = sensirion_word(&data[3..6]).ok_or(DriverFault::ChecksumMismatch)?;

        let temperature = -45.0 + 175.0 * raw_t as f32 / 65535.0;
        let humidity = 100.0 * raw_h as f32 / 65535.0;

        Ok((temperature, humidity))
    }
}

impl<B: Board> SensorDriver<B> for Sht31 {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        let address = self.params.address;

        write_bytes(board, address, &CMD_SOFT_RESET)?;
        board.delay_ms(2);

        write_bytes(board, address, &CMD_READ_STATUS)?;
        let mut status = [0u8; 3];
        read_bytes(board, address, &mut status)?;
        sensirion_word(&status).ok_or(DriverFault::ChecksumMismatch)?;

        Ok(())
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let (temperature, humidity) = self.measure(board).unwrap_or_else(|e| {
            log::debug!("SHT31 at 0x{:02X}: {}", self.params.address, e);
            (f32::NAN, f32::NAN)
        });

        if temperature.is_nan() {
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
