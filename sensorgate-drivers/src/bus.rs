use alloc::vec::Vec;

use embedded_hal::i2c::I2c;

use crate::board::Board;
use crate::error::{DriverFault, Result};

/// TCA9548A default address.
pub const MUX_ADDRESS: u8 = 0x70;
pub const MUX_CHANNELS: u8 = 8;

/// A sub-bus behind the I2C channel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MuxChannel(u8);

impl MuxChannel {
    pub fn new(channel: u8) -> Option<Self> {
        (channel < MUX_CHANNELS).then_some(Self(channel))
    }

    /// Configuration stores `-1` for "direct bus".
    pub fn from_config(raw: i8) -> Option<Self> {
        u8::try_from(raw).ok().and_then(Self::new)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn mask(self) -> u8 {
        1 << self.0
    }
}

/// Serializes access to multiplexed slots.
///
/// The switch state is global to the bus, so the arbiter never assumes the
/// previously selected channel is still active: every `select` is a write.
/// Callers `release` after each multiplexed transfer so a direct-bus device
/// never shares an address with a sub-bus left switched in.
#[derive(Debug, Clone, Copy)]
pub struct BusArbiter {
    address: u8,
}

impl BusArbiter {
    pub fn new() -> Self {
        Self {
            address: MUX_ADDRESS,
        }
    }

    pub fn with_address(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn select<B: Board>(&self, board: &mut B, channel: MuxChannel) -> Result<()> {
        log::trace!("select mux channel {}", channel.index());

        board
            .i2c()
            .write(self.address, &[channel.mask()])
            .map_err(|e| DriverFault::from_i2c(self.address, e))
    }

    /// Disconnects every channel.
    pub fn release<B: Board>(&self, board: &mut B) -> Result<()> {
        board
            .i2c()
            .write(self.address, &[0])
            .map_err(|e| DriverFault::from_i2c(self.address, e))
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Probes 0x01..=0x7E with an empty write and returns the addresses that ACK.
pub fn scan<I: I2c>(i2c: &mut I) -> Vec<u8> {
    (0x01..0x7F)
        .filter(|&address| i2c.write(address, &[]).is_ok())
        .collect()
}

pub(crate) fn read_registers<B: Board>(
    board: &mut B,
    address: u8,
    register: u8,
    buffer: &mut [u8],
) -> Result<()> {
    board
        .i2c()
        .write_read(address, &[register], buffer)
        .map_err(|e| DriverFault::from_i2c(address, e))
}

pub(crate) fn read_register<B: Board>(board: &mut B, address: u8, register: u8) -> Result<u8> {
    let mut value = [0u8; 1];
    read_registers(board, address, register, &mut value)?;
    Ok(value[0])
}

pub(crate) fn write_bytes<B: Board>(board: &mut B, address: u8, bytes: &[u8]) -> Result<()> {
    board
        .i2c()
        .write(address, bytes)
        .map_err(|e| DriverFault::from_i2c(address, e))
}

pub(crate) fn read_bytes<B: Board>(board: &mut B, address: u8, buffer: &mut [u8]) -> Result<()> {
    board
        .i2c()
        .read(address, buffer)
        .map_err(|e| DriverFault::from_i2c(address, e))
}
