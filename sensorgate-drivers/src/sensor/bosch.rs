use alloc::vec;

use crate::board::Board;
use crate::bus::{read_register, read_registers, write_bytes};
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::kind::SensorKind;
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::read_failure;

const REG_CALIB_00: u8 = 0x88;
const REG_CALIB_26: u8 = 0xE1;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

const RESET_WORD: u8 = 0xB6;
const STATUS_IM_UPDATE: u8 = 0x01;

const BME280_CHIP_ID: u8 = 0x60;
const BMP280_CHIP_IDS: [u8; 3] = [0x56, 0x57, 0x58];

// osrs_t x1, osrs_p x1, normal mode
const CTRL_MEAS_NORMAL: u8 = 0b001_001_11;
// t_sb 1000 ms, filter off
const CONFIG_STANDBY_1S: u8 = 0b101_000_00;
const CTRL_HUM_X1: u8 = 0x01;

// ADC value reported when a measurement was skipped.
const SKIPPED: i32 = 0x80000;

/// Factory trimming parameters (datasheet §4.2.2).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoschCalibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl BoschCalibration {
    fn parse(block: &[u8; 26], humidity: Option<&[u8; 7]>) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([block[i], block[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([block[i], block[i + 1]]);

        let mut calibration = Self {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
            h1: block[25],
            ..Self::default()
        };

        if let Some(h) = humidity {
            calibration.h2 = i16::from_le_bytes([h[0], h[1]]);
            calibration.h3 = h[2];
            calibration.h4 = ((h[3] as i8 as i16) << 4) | (h[4] & 0x0F) as i16;
            calibration.h5 = ((h[5] as i8 as i16) << 4) | (h[4] >> 4) as i16;
            calibration.h6 = h[6] as i8;
        }

        calibration
    }

    /// Returns `(temperature °C, t_fine)`.
    fn temperature(&self, adc: i32) -> (f64, f64) {
        let adc = adc as f64;
        let t1 = self.t1 as f64;

        let var1 = (adc / 16384.0 - t1 / 1024.0) * self.t2 as f64;
        let var2 = (adc / 131072.0 - t1 / 8192.0) * (adc / 131072.0 - t1 / 8192.0) * self.t3 as f64;
        let t_fine = var1 + var2;

        (t_fine / 5120.0, t_fine)
    }

    /// Pressure in pascal.
    fn pressure(&self, adc: i32, t_fine: f64) -> f64 {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * self.p6 as f64 / 32768.0;
        var2 += var1 * self.p5 as f64 * 2.0;
        var2 = var2 / 4.0 + self.p4 as f64 * 65536.0;
        var1 = (self.p3 as f64 * var1 * var1 / 524288.0 + self.p2 as f64 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.p1 as f64;

        if var1 == 0.0 {
            return 0.0;
        }

        let mut p = 1048576.0 - adc as f64;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = self.p9 as f64 * p * p / 2147483648.0;
        let var2 = p * self.p8 as f64 / 32768.0;

        p + (var1 + var2 + self.p7 as f64) / 16.0
    }

    /// Relative humidity in percent.
    fn humidity(&self, adc: i32, t_fine: f64) -> f64 {
        let h = t_fine - 76800.0;
        let h = (adc as f64 - (self.h4 as f64 * 64.0 + self.h5 as f64 / 16384.0 * h))
            * (self.h2 as f64 / 65536.0
                * (1.0 + self.h6 as f64 / 67108864.0 * h * (1.0 + self.h3 as f64 / 67108864.0 * h)));
        let h = h * (1.0 - self.h1 as f64 * h / 524288.0);

        h.clamp(0.0, 100.0)
    }
}

/// BME280 (T/H/P) and BMP280 (T/P) on I2C.
pub struct BoschSensor {
    params: DriverParams,
    calibration: Option<BoschCalibration>,
}

impl BoschSensor {
    pub fn new(params: DriverParams) -> Self {
        Self {
            params,
            calibration: None,
        }
    }

    fn has_humidity(&self) -> bool {
        self.params.kind == SensorKind::Bme280
    }

    fn probe<B: Board>(&self, board: &mut B) -> Result<()> {
        let address = self.params.address;
        let id = read_register(board, address, REG_CHIP_ID)?;

        let expected = match self.params.kind {
            SensorKind::Bme280 => id == BME280_CHIP_ID,
            _ => BMP280_CHIP_IDS.contains(&id),
        };
        if !expected {
            return Err(DriverFault::UnexpectedDevice { address, id });
        }

        write_bytes(board, address, &[REG_RESET, RESET_WORD])?;
        board.delay_ms(10);

        for _ in 0..10 {
            if read_register(board, address, REG_STATUS)? & STATUS_IM_UPDATE == 0 {
                return Ok(());
            }
            board.delay_ms(10);
        }

        Err(DriverFault::NotReady)
    }

    fn read_calibration<B: Board>(&self, board: &mut B) -> Result<BoschCalibration> {
        let address = self.params.address;

        let mut block = [0u8; 26];
        read_registers(board, address, REG_CALIB_00, &mut block)?;

        let humidity = if self.has_humidity() {
            let mut h = [0u8; 7];
            read_registers(board, address, REG_CALIB_26, &mut h)?;
            Some(h)
        } else {
            None
        };

        Ok(BoschCalibration::parse(&block, humidity.as_ref()))
    }

    fn configure<B: Board>(&self, board: &mut B) -> Result<()> {
        let address = self.params.address;

        // ctrl_hum only latches after a write to ctrl_meas
        if self.has_humidity() {
            write_bytes(board, address, &[REG_CTRL_HUM, CTRL_HUM_X1])?;
        }
        write_bytes(board, address, &[REG_CONFIG, CONFIG_STANDBY_1S])?;
        write_bytes(board, address, &[REG_CTRL_MEAS, CTRL_MEAS_NORMAL])
    }

    /// Returns `(temperature, pressure hPa, humidity)`; temperature is NaN on failure.
    fn read<B: Board>(&self, board: &mut B) -> (f32, f32, f32) {
        const FAILED: (f32, f32, f32) = (f32::NAN, f32::NAN, f32::NAN);

        let Some(calibration) = self.calibration else {
            return FAILED;
        };

        let mut data = [0u8; 8];
        let len = if self.has_humidity() { 8 } else { 6 };
        if let Err(e) = read_registers(board, self.params.address, REG_DATA, &mut data[..len]) {
            log::debug!("{} burst read failed: {}", self.params.kind.label(), e);
            return FAILED;
        }

        let adc_p = ((data[0] as i32) << 12) | ((data[1] as i32) << 4) | ((data[2] as i32) >> 4);
        let adc_t = ((data[3] as i32) << 12) | ((data[4] as i32) << 4) | ((data[5] as i32) >> 4);
        let adc_h = ((data[6] as i32) << 8) | data[7] as i32;

        if adc_t == SKIPPED {
            return FAILED;
        }

        let (temperature, t_fine) = calibration.temperature(adc_t);
        let pressure = calibration.pressure(adc_p, t_fine) / 100.0;
        let humidity = if self.has_humidity() {
            calibration.humidity(adc_h, t_fine)
        } else {
            f64::NAN
        };

        (temperature as f32, pressure as f32, humidity as f32)
    }
}

impl<B: Board> SensorDriver<B> for BoschSensor {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        self.calibration = None;

        self.probe(board)?;
        let calibration = self.read_calibration(board)?;
        self.configure(board)?;

        self.calibration = Some(calibration);
        Ok(())
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let (temperature, pressure, humidity) = self.read(board);

        if temperature.is_nan() {
            return SensorSnapshot::failed(&self.params, read_failure(self.params.kind));
        }

        let mut readings = vec![Reading::new(MeasurementKind::Temperature, temperature)];
        if self.has_humidity() {
            readings.push(Reading::new(MeasurementKind::Humidity, humidity));
        }
        readings.push(Reading::new(MeasurementKind::Pressure, pressure));

        SensorSnapshot::from_readings(&self.params, readings)
    }
}
