use alloc::vec;

use crate::board::Board;
use crate::bus::{read_bytes, read_register, read_registers, write_bytes};
use crate::driver::{DriverParams, SensorDriver};
use crate::error::{DriverFault, Result};
use crate::types::{MeasurementKind, Reading, SensorSnapshot};

use super::READ_FAILED;

const BH1750_POWER_ON: u8 = 0x01;
const BH1750_CONTINUOUS_HIGH_RES: u8 = 0x10;

/// BH1750 ambient light sensor in continuous high-resolution mode.
pub struct Bh1750 {
    params: DriverParams,
}

impl Bh1750 {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    /// Lux, or a negative value when the read failed.
    fn lux<B: Board>(&self, board: &mut B) -> f32 {
        let mut data = [0u8; 2];
        match read_bytes(board, self.params.address, &mut data) {
            Ok(()) => u16::from_be_bytes(data) as f32 / 1.2,
            Err(e) => {
                log::debug!("BH1750 at 0x{:02X}: {}", self.params.address, e);
                -1.0
            }
        }
    }
}

impl<B: Board> SensorDriver<B> for Bh1750 {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        write_bytes(board, self.params.address, &[BH1750_POWER_ON])?;
        write_bytes(board, self.params.address, &[BH1750_CONTINUOUS_HIGH_RES])?;
        board.delay_ms(180);
        Ok(())
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let lux = self.lux(board);
        if lux < 0.0 {
            return SensorSnapshot::failed(&self.params, READ_FAILED);
        }

        SensorSnapshot::from_readings(&self.params, vec![Reading::new(MeasurementKind::Light, lux)])
    }
}

const TSL2561_COMMAND: u8 = 0x80;
const TSL2561_WORD: u8 = 0x20;
const TSL2561_REG_CONTROL: u8 = 0x00;
const TSL2561_REG_TIMING: u8 = 0x01;
const TSL2561_REG_DATA0: u8 = 0x0C;
const TSL2561_REG_DATA1: u8 = 0x0E;

const TSL2561_POWER_ON: u8 = 0x03;
/// 16x gain, 402 ms integration: the nominal scale of the lux equations.
const TSL2561_TIMING_16X_402MS: u8 = 0x12;

/// TSL2561 broadband/infrared light sensor (T/FN/CL package equations).
pub struct Tsl2561 {
    params: DriverParams,
}

impl Tsl2561 {
    pub fn new(params: DriverParams) -> Self {
        Self { params }
    }

    fn channels<B: Board>(&self, board: &mut B) -> Result<(u16, u16)> {
        let address = self.params.address;
        let mut ch0 = [0u8; 2];
        let mut ch1 = [0u8; 2];

        read_registers(board, address, TSL2561_COMMAND | TSL2561_WORD | TSL2561_REG_DATA0, &mut ch0)?;
        read_registers(board, address, TSL2561_COMMAND | TSL2561_WORD | TSL2561_REG_DATA1, &mut ch1)?;

        Ok((u16::from_le_bytes(ch0), u16::from_le_bytes(ch1)))
    }

    /// Lux, 0 on failure or when either channel saturated.
    fn lux<B: Board>(&self, board: &mut B) -> f32 {
        match self.channels(board) {
            Ok((ch0, ch1)) => lux(ch0, ch1),
            Err(e) => {
                log::debug!("TSL2561 at 0x{:02X}: {}", self.params.address, e);
                0.0
            }
        }
    }
}

fn lux(ch0: u16, ch1: u16) -> f32 {
    if ch0 == 0 || ch0 == u16::MAX || ch1 == u16::MAX {
        return 0.0;
    }

    let (ch0, ch1) = (ch0 as f32, ch1 as f32);
    let ratio = ch1 / ch0;

    let lux = if ratio <= 0.50 {
        0.0304 * ch0 - 0.062 * ch0 * libm::powf(ratio, 1.4)
    } else if ratio <= 0.61 {
        0.0224 * ch0 - 0.031 * ch1
    } else if ratio <= 0.80 {
        0.0128 * ch0 - 0.0153 * ch1
    } else if ratio <= 1.30 {
        0.00146 * ch0 - 0.00112 * ch1
    } else {
        0.0
    };

    lux.max(0.0)
}

impl<B: Board> SensorDriver<B> for Tsl2561 {
    fn params(&self) -> &DriverParams {
        &self.params
    }

    fn initialize(&mut self, board: &mut B) -> Result<()> {
        let address = self.params.address;
        let control = TSL2561_COMMAND | TSL2561_REG_CONTROL;

        write_bytes(board, address, &[control, TSL2561_POWER_ON])?;
        let readback = read_register(board, address, control)?;
        if readback & 0x03 != TSL2561_POWER_ON {
            return Err(DriverFault::UnexpectedDevice { address, id: readback });
        }

        write_bytes(
            board,
            address,
            &[TSL2561_COMMAND | TSL2561_REG_TIMING, TSL2561_TIMING_16X_402MS],
        )
    }

    fn sample(&mut self, board: &mut B) -> SensorSnapshot {
        let lux = self.lux(board);
        if lux == 0.0 {
            return SensorSnapshot::failed(&self.params, READ_FAILED);
        }

        SensorSnapshot::from_readings(&self.params, vec![Reading::new(MeasurementKind::Light, lux)])
    }
}
