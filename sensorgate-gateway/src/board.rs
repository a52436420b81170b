use sensorgate_drivers::Board;
use sensorgate_drivers::embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

/// Bus with nothing attached: every address NACKs.
#[derive(Debug, Default)]
pub struct DetachedBus;

impl ErrorType for DetachedBus {
    type Error = ErrorKind;
}

impl i2c::I2c for DetachedBus {
    fn transaction(&mut self, _address: u8, _operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
    }
}

/// Board used when the gateway runs on a host without sensor wiring.
///
/// Drivers initialize and sample against it like any other board and report
/// their usual faults, which keeps simulation mode and the whole publish path
/// usable on a workstation. There is no device to wait for, so delays only
/// advance a counter and never block the runtime thread.
#[derive(Debug, Default)]
pub struct UnattachedBoard {
    bus: DetachedBus,
    waited_ms: u64,
}

impl UnattachedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total delay drivers have requested so far.
    pub fn waited_ms(&self) -> u64 {
        self.waited_ms
    }
}

impl Board for UnattachedBoard {
    type I2c = DetachedBus;

    fn i2c(&mut self) -> &mut Self::I2c {
        &mut self.bus
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waited_ms += u64::from(ms);
    }
}
