//! In-memory board for tests.
//!
//! I2C devices are modelled at register level: a write sets the register
//! pointer (first byte) and stores any following bytes with auto-increment,
//! a read returns registers from the pointer onwards. Command-style parts
//! (SHT31, SCD40, BH1750) register canned responses for whole command writes
//! instead. Devices placed behind a multiplexer channel only acknowledge
//! while that channel is selected on the switch.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

use crate::board::{AdcProfile, Board, PinMode};
use crate::bus::MUX_ADDRESS;
use crate::error::{DriverFault, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    I2cWrite { address: u8, bytes: Vec<u8> },
    I2cRead { address: u8, len: usize },
    DhtFrame { pin: u8 },
    OneWireReset { pin: u8 },
    AnalogRead { pin: u8 },
    DigitalRead { pin: u8 },
}

impl BoardEvent {
    pub fn address(&self) -> Option<u8> {
        match self {
            BoardEvent::I2cWrite { address, .. } | BoardEvent::I2cRead { address, .. } => {
                Some(*address)
            }
            _ => None,
        }
    }
}

/// Shared handle onto the board's transaction log.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<BoardEvent>>>);

impl EventLog {
    fn push(&self, event: BoardEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn snapshot(&self) -> Vec<BoardEvent> {
        self.0.borrow().clone()
    }

    pub fn take(&self) -> Vec<BoardEvent> {
        core::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[derive(Debug, Clone)]
pub struct RegisterDevice {
    address: u8,
    channel: Option<u8>,
    registers: [u8; 256],
    pointer: u8,
    commands: Vec<(Vec<u8>, Vec<u8>)>,
    response: Option<Vec<u8>>,
}

impl RegisterDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            channel: None,
            registers: [0; 256],
            pointer: 0,
            commands: Vec::new(),
            response: None,
        }
    }

    pub fn behind_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        self.registers[register as usize] = value;
        self
    }

    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        self.set_registers(start, values);
        self
    }

    /// Answers reads after an exact `command` write with `response`.
    pub fn with_response(mut self, command: &[u8], response: &[u8]) -> Self {
        self.set_response(command, response);
        self
    }

    pub fn set_registers(&mut self, start: u8, values: &[u8]) {
        for (offset, value) in values.iter().enumerate() {
            self.registers[(start as usize + offset) & 0xFF] = *value;
        }
    }

    pub fn set_response(&mut self, command: &[u8], response: &[u8]) {
        self.commands.retain(|(c, _)| c.as_slice() != command);
        self.commands.push((command.to_vec(), response.to_vec()));
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    fn write(&mut self, bytes: &[u8]) {
        if let Some((_, response)) = self.commands.iter().find(|(c, _)| c.as_slice() == bytes) {
            self.response = Some(response.clone());
            return;
        }
        self.response = None;

        if let Some((pointer, data)) = bytes.split_first() {
            self.pointer = *pointer;
            self.set_registers(*pointer, data);
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        match &self.response {
            Some(response) => {
                for (slot, value) in buffer.iter_mut().zip(response.iter().chain(core::iter::repeat(&0))) {
                    *slot = *value;
                }
            }
            None => {
                for (offset, slot) in buffer.iter_mut().enumerate() {
                    *slot = self.registers[(self.pointer as usize + offset) & 0xFF];
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MockI2c {
    multiplexer: Option<u8>,
    selected: u8,
    devices: Vec<RegisterDevice>,
    events: EventLog,
}

impl MockI2c {
    fn visible(&self, device: &RegisterDevice) -> bool {
        match device.channel {
            None => true,
            Some(channel) => self.multiplexer.is_some() && self.selected & (1 << channel) != 0,
        }
    }

    fn nack() -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl i2c::I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => self.events.push(BoardEvent::I2cWrite {
                    address,
                    bytes: bytes.to_vec(),
                }),
                Operation::Read(buffer) => self.events.push(BoardEvent::I2cRead {
                    address,
                    len: buffer.len(),
                }),
            }

            if Some(address) == self.multiplexer {
                match operation {
                    Operation::Write(bytes) => {
                        if let Some(mask) = bytes.first() {
                            self.selected = *mask;
                        }
                    }
                    Operation::Read(buffer) => buffer.fill(self.selected),
                }
                continue;
            }

            let index = self
                .devices
                .iter()
                .position(|d| d.address == address && self.visible(d))
                .ok_or_else(Self::nack)?;
            let device = &mut self.devices[index];

            match operation {
                Operation::Write(bytes) => device.write(bytes),
                Operation::Read(buffer) => device.read(buffer),
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
struct OneWireProbe {
    scratchpad: [u8; 9],
    cursor: Option<usize>,
}

#[derive(Debug)]
pub struct MockBoard {
    i2c: MockI2c,
    adc: AdcProfile,
    analog: BTreeMap<u8, u16>,
    digital: BTreeMap<u8, bool>,
    dht: BTreeMap<u8, [u8; 5]>,
    one_wire: BTreeMap<u8, OneWireProbe>,
    pin_modes: BTreeMap<u8, PinMode>,
    elapsed_ms: u64,
}

impl MockBoard {
    /// A board with a TCA9548A at its default address and nothing else.
    pub fn new() -> Self {
        Self {
            i2c: MockI2c {
                multiplexer: Some(MUX_ADDRESS),
                ..MockI2c::default()
            },
            adc: AdcProfile::ESP32,
            analog: BTreeMap::new(),
            digital: BTreeMap::new(),
            dht: BTreeMap::new(),
            one_wire: BTreeMap::new(),
            pin_modes: BTreeMap::new(),
            elapsed_ms: 0,
        }
    }

    pub fn without_multiplexer(mut self) -> Self {
        self.i2c.multiplexer = None;
        self
    }

    pub fn with_adc_profile(mut self, adc: AdcProfile) -> Self {
        self.adc = adc;
        self
    }

    pub fn with_device(mut self, device: RegisterDevice) -> Self {
        self.i2c.devices.push(device);
        self
    }

    pub fn with_analog(mut self, pin: u8, raw: u16) -> Self {
        self.analog.insert(pin, raw);
        self
    }

    pub fn with_digital(mut self, pin: u8, level: bool) -> Self {
        self.digital.insert(pin, level);
        self
    }

    pub fn with_dht_frame(mut self, pin: u8, frame: [u8; 5]) -> Self {
        self.dht.insert(pin, frame);
        self
    }

    /// Attaches a DS18B20 answering with `scratchpad` (CRC is the caller's job).
    pub fn with_one_wire(mut self, pin: u8, scratchpad: [u8; 9]) -> Self {
        self.one_wire.insert(
            pin,
            OneWireProbe {
                scratchpad,
                cursor: None,
            },
        );
        self
    }

    pub fn events(&self) -> EventLog {
        self.i2c.events.clone()
    }

    pub fn device_mut(&mut self, address: u8) -> Option<&mut RegisterDevice> {
        self.i2c.devices.iter_mut().find(|d| d.address == address)
    }

    pub fn set_analog(&mut self, pin: u8, raw: u16) {
        self.analog.insert(pin, raw);
    }

    pub fn set_digital(&mut self, pin: u8, level: bool) {
        self.digital.insert(pin, level);
    }

    pub fn set_dht_frame(&mut self, pin: u8, frame: Option<[u8; 5]>) {
        match frame {
            Some(frame) => self.dht.insert(pin, frame),
            None => self.dht.remove(&pin),
        };
    }

    pub fn selected_channels(&self) -> u8 {
        self.i2c.selected
    }

    pub fn pin_mode(&self, pin: u8) -> Option<PinMode> {
        self.pin_modes.get(&pin).copied()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for MockBoard {
    type I2c = MockI2c;

    fn i2c(&mut self) -> &mut Self::I2c {
        &mut self.i2c
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }

    fn adc_profile(&self) -> AdcProfile {
        self.adc
    }

    fn configure_pin(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        self.pin_modes.insert(pin, mode);
        Ok(())
    }

    fn analog_read(&mut self, pin: u8) -> Result<u16> {
        self.i2c.events.push(BoardEvent::AnalogRead { pin });
        self.analog.get(&pin).copied().ok_or(DriverFault::Unsupported)
    }

    fn digital_read(&mut self, pin: u8) -> Result<bool> {
        self.i2c.events.push(BoardEvent::DigitalRead { pin });
        self.digital.get(&pin).copied().ok_or(DriverFault::Unsupported)
    }

    fn read_dht_frame(&mut self, pin: u8) -> Result<[u8; 5]> {
        self.i2c.events.push(BoardEvent::DhtFrame { pin });
        self.dht.get(&pin).copied().ok_or(DriverFault::Timeout)
    }

    fn one_wire_reset(&mut self, pin: u8) -> Result<bool> {
        self.i2c.events.push(BoardEvent::OneWireReset { pin });
        Ok(match self.one_wire.get_mut(&pin) {
            Some(probe) => {
                probe.cursor = None;
                true
            }
            None => false,
        })
    }

    fn one_wire_write(&mut self, pin: u8, byte: u8) -> Result<()> {
        let probe = self.one_wire.get_mut(&pin).ok_or(DriverFault::NoPresencePulse)?;
        // Read Scratchpad arms the byte stream; other commands are accepted silently.
        if byte == 0xBE {
            probe.cursor = Some(0);
        }
        Ok(())
    }

    fn one_wire_read(&mut self, pin: u8) -> Result<u8> {
        let Some(probe) = self.one_wire.get_mut(&pin) else {
            return Ok(0xFF);
        };

        Ok(match probe.cursor {
            Some(cursor) if cursor < probe.scratchpad.len() => {
                probe.cursor = Some(cursor + 1);
                probe.scratchpad[cursor]
            }
            // Conversion status poll: done.
            _ => 0xFF,
        })
    }
}

/// Builds a Sensirion `[msb, lsb, crc]` triple.
pub fn sensirion_word(value: u16) -> [u8; 3] {
    let [msb, lsb] = value.to_be_bytes();
    [msb, lsb, crate::checksum::sensirion(&[msb, lsb])]
}

/// Builds a DS18B20 scratchpad for `raw` (1/16 °C) with a valid CRC.
pub fn ds18b20_scratchpad(raw: i16) -> [u8; 9] {
    let [lsb, msb] = raw.to_le_bytes();
    let mut scratchpad = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0];
    scratchpad[8] = crate::checksum::maxim(&scratchpad[..8]);
    scratchpad
}

/// Builds a DHT frame with a valid checksum.
pub fn dht_frame(bytes: [u8; 4]) -> [u8; 5] {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    [bytes[0], bytes[1], bytes[2], bytes[3], sum]
}

pub fn events_for(events: &[BoardEvent], address: u8) -> Vec<BoardEvent> {
    events
        .iter()
        .filter(|e| e.address() == Some(address))
        .cloned()
        .collect()
}

pub fn mux_select(channel: u8) -> BoardEvent {
    BoardEvent::I2cWrite {
        address: MUX_ADDRESS,
        bytes: vec![1 << channel],
    }
}

pub fn mux_release() -> BoardEvent {
    BoardEvent::I2cWrite {
        address: MUX_ADDRESS,
        bytes: vec![0],
    }
}

/// BME280 loaded with the datasheet's worked-example trimming and raw values
/// (25.08 C, 1006.53 hPa) plus a humidity sample reading about 33.3 %.
pub fn bme280_device(address: u8) -> RegisterDevice {
    bosch_device(address, 0x60)
        .with_registers(0xE1, &[0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E])
        .with_registers(0xFD, &[0x66, 0x00])
}

pub fn bmp280_device(address: u8) -> RegisterDevice {
    bosch_device(address, 0x58)
}

fn bosch_device(address: u8, chip_id: u8) -> RegisterDevice {
    let words: [i32; 12] = [
        27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
    ];
    let mut calibration = Vec::with_capacity(26);
    for word in words {
        calibration.extend_from_slice(&(word as u16).to_le_bytes());
    }
    calibration.extend_from_slice(&[0x00, 75]);

    RegisterDevice::new(address)
        .with_register(0xD0, chip_id)
        .with_registers(0x88, &calibration)
        .with_registers(0xF7, &[0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00])
}
