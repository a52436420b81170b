use sensorgate_drivers::{
    Board, BusArbiter, DriverParams, MuxChannel, SensorDriver, SensorSnapshot, instantiate,
};

use crate::configs::DeviceConfig;

/// A live driver plus the multiplexer channel it sits behind.
pub struct ActiveSensor<B: Board> {
    driver: Box<dyn SensorDriver<B>>,
    channel: Option<MuxChannel>,
}

impl<B: Board> ActiveSensor<B> {
    pub fn params(&self) -> &DriverParams {
        self.driver.params()
    }

    pub fn channel(&self) -> Option<MuxChannel> {
        self.channel
    }

    /// Selects this sensor's channel (if any), takes one sample and switches
    /// the channel back out.
    pub fn sample(&mut self, board: &mut B, arbiter: &BusArbiter) -> SensorSnapshot {
        let Some(channel) = self.channel else {
            return self.driver.sample(board);
        };

        if let Err(e) = arbiter.select(board, channel) {
            tracing::warn!(
                "slot {}: channel {} select failed: {}",
                self.params().slot,
                channel.index(),
                e
            );
            return SensorSnapshot::failed(self.params(), e.to_string());
        }

        let snapshot = self.driver.sample(board);
        release(board, arbiter, self.params().slot);
        snapshot
    }
}

/// Owns the driver set built from the slot table.
pub struct SensorRegistry<B: Board> {
    arbiter: BusArbiter,
    sensors: Vec<ActiveSensor<B>>,
}

impl<B: Board> SensorRegistry<B> {
    pub fn new(arbiter: BusArbiter) -> Self {
        Self {
            arbiter,
            sensors: Vec::new(),
        }
    }

    /// Drops every driver, then instantiates and initializes one per
    /// non-empty slot. Initialization failures are logged and the driver is
    /// kept so later samples report the fault.
    pub fn rebuild(&mut self, board: &mut B, config: &DeviceConfig) {
        self.sensors.clear();

        for (index, slot) in config.active_slots() {
            let channel = slot.mux_channel();
            if slot.kind.is_i2c() && slot.i2c_multiplexer_channel >= 0 && channel.is_none() {
                tracing::warn!(
                    "slot {}: multiplexer channel {} out of range, using the direct bus",
                    index,
                    slot.i2c_multiplexer_channel
                );
            }

            let params = DriverParams::new(index, slot.kind, slot.pin, slot.i2c_address);
            let Some(driver) = instantiate::<B>(params) else {
                continue;
            };
            let mut sensor = ActiveSensor { driver, channel };

            let selected = match channel {
                Some(channel) => self.arbiter.select(board, channel),
                None => Ok(()),
            };

            match selected.and_then(|_| sensor.driver.initialize(board)) {
                Ok(()) => tracing::info!("slot {}: {} ready on pin {}", index, slot.kind.label(), slot.pin),
                Err(e) => tracing::error!("slot {}: {} init failed: {}", index, slot.kind.label(), e),
            }
            if channel.is_some() {
                release(board, &self.arbiter, index);
            }

            self.sensors.push(sensor);
        }

        tracing::debug!("registry rebuilt with {} active sensors", self.sensors.len());
    }

    pub fn arbiter(&self) -> &BusArbiter {
        &self.arbiter
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveSensor<B>> {
        self.sensors.iter()
    }

    pub(crate) fn parts_mut(&mut self) -> (&BusArbiter, &mut [ActiveSensor<B>]) {
        (&self.arbiter, &mut self.sensors)
    }
}

fn release<B: Board>(board: &mut B, arbiter: &BusArbiter, slot: usize) {
    if let Err(e) = arbiter.release(board) {
        tracing::warn!("slot {}: multiplexer release failed: {}", slot, e);
    }
}
