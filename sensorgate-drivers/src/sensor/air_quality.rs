use alloc::vec;

use crate::board::Board;
use crate::bus::{read_bytes, read_register, read_registers, write_bytes};
use crate::checksum::sensirion_word;
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::NO_DATA;

mod ccs811 {
    pub const STATUS: u8 = 0x00;
    pub const MEAS_MODE: u8 = 0x01;
    pub const ALG_RESULT_DATA: u8 = 0x02;
    pub const HW_ID: u8 = 0x20;
    pub const APP_START: u8 = 0xF4;

    pub const HW_ID_CODE: u8 = 0x81;

    pub const STATUS_ERROR: u8 = 1 << 0;
    pub const STATUS_DATA_READY: u8 = 1 << 3;
    pub const STATUS_APP_VALID: u8 = 1 << 4;

    /// Drive mode 1: constant power, one measurement per second.
    pub const DRIVE_MODE_1S: u8 = 0x10;
}

/// CCS811 eCO2/TVOC sensor. Results are gated on `STATUS.DATA_READY`.
pub struct Ccs811 {
    params: DriverParams,
    running: bool,
}

impl Ccs811 {
    pub fn new(params: DriverParams) -> Self {
        Self {
            params,
            running: false,
        }
    }

    /// `None` when no new result is available this cycle.
    fn read<B: Board>(&self, board: &mut B) -> Result<Option<(u16, u16)>> {
        let address = self.params.address;

        let status = read_register(board, address, ccs811::STATUS)?;
        if status & ccs811::STATUS_ERROR != 0 || status & ccs811::STATUS_DATA_READY == 0 {
            return Ok(None);
        }

        let mut data = [0u8; 4];
        read_registers(board, address, ccs811::ALG_RESULT_DATA, &mut data)?;

        Ok(Some((
            u16::from_be_bytes([data[0], data[1]]),
            u16::from_be_bytes([data[2], data[3]]),
        )))
    }
}

impl<B: Board> SensorDriver<B> for Ccs811 {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        let address = self.params.address;
        self.running = false;

        let id = read_register(board, address, ccs811::HW_ID)?;
        if id != ccs811::HW_ID_CODE {
            return Err(DriverFault::UnexpectedDevice { address, id });
        }

        if read_register(board, address, ccs811::STATUS)? & ccs811::STATUS_APP_VALID == 0 {
            return Err(DriverFault::NotReady);
        }

        write_bytes(board, address, &[ccs811::APP_START])?;
        board.delay_ms(1);
        write_bytes(board, address, &[ccs811::MEAS_MODE, ccs811::DRIVE_MODE_1S])?;

        self.running = true;
        Ok(())
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        if !self.running {
            return SensorSnapshot::failed(&self.params, NO_DATA);
        }

        match self.read(board) {
            Ok(Some((co2, tvoc))) => SensorSnapshot::from_readings(
                &self.params,
                vec![
                    Reading::new(MeasurementKind::Co2, co2 as f32),
                    Reading::new(MeasurementKind::Tvoc, tvoc as f32),
                ],
            ),
            Ok(None) => SensorSnapshot::failed(&self.params, NO_DATA),
            Err(e) => {
                log::debug!("CCS811 at 0x{:02X}: {}", self.params.address, e);
                SensorSnapshot::failed(&self.params, NO_DATA)
            }
        }
    }
}

const SCD40_START_PERIODIC: [u8; 2] = [0x21, 0xB1];
const SCD40_STOP_PERIODIC: [u8; 2] = [0x3F, 0x86];
const SCD40_DATA_READY: [u8; 2] = [0xE4, 0xB8];
const SCD40_READ_MEASUREMENT: [u8; 2] = [0xEC, 0x05];

/// SCD40 photoacoustic CO2 sensor in periodic mode (one result every 5 s).
pub struct Scd40 {
    params: DriverParams,
}

impl Scd40 {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    fn command<B: Board>(&self, board: &mut B, command: &[u8; 2], response: &mut [u8]) -> Result<()> {
        write_bytes(board, self.params.address, command)?;
        board.delay_ms(1);
        read_bytes(board, self.params.address, response)
    }

    fn data_ready<B: Board>(&self, board: &mut B) -> Result<bool> {
        let mut word = [0u8; 3];
        self.command(board, &SCD40_DATA_READY, &mut word)?;
        let status = sensirion_word(&word).ok_or(DriverFault::ChecksumMismatch)?;

        Ok(status & 0x07FF != 0)
    }

    /// `None` when the sensor has no fresh measurement.
    fn read<B: Board>(&self, board: &mut B) -> Result<Option<(f32, f32, f32)>> {
        if !self.data_ready(board)? {
            return Ok(None);
        }

        let mut data = [0u8; 9];
        self.command(board, &SCD40_READ_MEASUREMENT, &mut data)?;

        let co2 = sensirion_word(&data[0..3]).ok_or(DriverFault::ChecksumMismatch)?;
        let raw_t = sensirion_word(&data[3..6]).ok_or(DriverFault::ChecksumMismatch)?;
        let raw_h = sensirion_word(&data[6..9]).ok_or(DriverFault::ChecksumMismatch)?;

        Ok(Some((
            co2 as f32,
            -45.0 + 175.0 * raw_t as f32 / 65535.0,
            100.0 * raw_h as f32 / 65535.0,
        )))
    }
}

impl<B: Board> SensorDriver<B> for Scd40 {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        let address = self.params.address;

        // A warm reboot can leave the sensor measuring, which rejects other commands.
        write_bytes(board, address, &SCD40_STOP_PERIODIC)?;
        board.delay_ms(500);
        write_bytes(board, address, &SCD40_START_PERIODIC)
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        match self.read(board) {
            Ok(Some((co2, temperature, humidity))) => SensorSnapshot::from_readings(
                &self.params,
                vec![
                    Reading::new(MeasurementKind::Co2, co2),
                    Reading::new(MeasurementKind::Temperature, temperature),
                    Reading::new(MeasurementKind::Humidity, humidity),
                ],
            ),
            Ok(None) => SensorSnapshot::failed(&self.params, NO_DATA),
            Err(e) => {
                log::debug!("SCD40 at 0x{:02X}: {}", self.params.address, e);
                SensorSnapshot::failed(&self.params, NO_DATA)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::kind::SensorKind;
    use crate::mock::{MockBoard, RegisterDevice, sensirion_word as word};

    fn ccs811_device(status: u8) -> RegisterDevice {
        RegisterDevice::new(0x5A)
            .with_register(ccs811::HW_ID, ccs811::HW_ID_CODE)
            .with_register(ccs811::STATUS, status)
            .with_registers(ccs811::ALG_RESULT_DATA, &[0x01, 0x90, 0x00, 0x0C])
    }

    #[test]
    fn test_ccs811_ready() {
        let mut board = MockBoard::new().with_device(ccs811_device(0x98));
        let mut sensor = Ccs811::new(DriverParams::new(0, SensorKind::Ccs811, 0, 0));

        sensor.initialize(&mut board).unwrap();
        let snapshot = sensor.sample(&mut board);

        assert!(snapshot.valid);
        assert_eq!(snapshot.value_of(MeasurementKind::Co2), Some(400.0));
        assert_eq!(snapshot.value_of(MeasurementKind::Tvoc), Some(12.0));
        assert_eq!(
            board.device_mut(0x5A).unwrap().register(ccs811::MEAS_MODE),
            ccs811::DRIVE_MODE_1S
        );
    }

    #[test]
    fn test_ccs811_not_ready_is_transient() {
        let mut board = MockBoard::new().with_device(ccs811_device(0x90));
        let mut sensor = Ccs811::new(DriverParams::new(0, SensorKind::Ccs811, 0, 0));
        sensor.initialize(&mut board).unwrap();

        let snapshot = sensor.sample(&mut board);
        assert!(!snapshot.valid);
        assert_eq!(snapshot.error.as_deref(), Some("No data available"));

        board.device_mut(0x5A).unwrap().set_registers(ccs811::STATUS, &[0x98]);
        assert!(sensor.sample(&mut board).valid);
    }

    #[test]
    fn test_ccs811_without_app_fails_initialize() {
        let mut board = MockBoard::new().with_device(ccs811_device(0x00));
        let mut sensor = Ccs811::new(DriverParams::new(0, SensorKind::Ccs811, 0, 0));

        assert_eq!(sensor.initialize(&mut board), Err(DriverFault::NotReady));
        assert_eq!(sensor.sample(&mut board).error.as_deref(), Some("No data available"));
    }

    fn scd40_device(ready: u16) -> RegisterDevice {
        let measurement: Vec<u8> = [612u16, 0x6666, 0x8000]
            .into_iter()
            .flat_map(word)
            .collect();

        RegisterDevice::new(0x62)
            .with_response(&SCD40_DATA_READY, &word(ready))
            .with_response(&SCD40_READ_MEASUREMENT, &measurement)
    }

    #[test]
    fn test_scd40_measurement() {
        let mut board = MockBoard::new().with_device(scd40_device(0x8006));
        let mut sensor = Scd40::new(DriverParams::new(1, SensorKind::Scd40, 0, 0));

        sensor.initialize(&mut board).unwrap();
        let snapshot = sensor.sample(&mut board);

        assert!(snapshot.valid);
        assert_eq!(snapshot.value_of(MeasurementKind::Co2), Some(612.0));
        assert!((snapshot.value_of(MeasurementKind::Temperature).unwrap() - 25.0).abs() < 0.01);
        assert!((snapshot.value_of(MeasurementKind::Humidity).unwrap() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_scd40_not_ready() {
        let mut board = MockBoard::new().with_device(scd40_device(0x8000));
        let mut sensor = Scd40::new(DriverParams::new(1, SensorKind::Scd40, 0, 0));

        let snapshot = sensor.sample(&mut board);

        assert!(!snapshot.valid);
        assert_eq!(snapshot.error.as_deref(), Some("No data available"));
    }
}
