use rand::Rng;
use sensorgate_drivers::{
    Board, BusArbiter, DriverParams, MeasurementKind, Reading, SensorKind, SensorSnapshot,
};

use crate::configs::DeviceConfig;
use crate::services::SensorRegistry;

/// The periodic sweep and the snapshot set it produces.
///
/// Outside simulation there is exactly one snapshot per active sensor, in
/// slot order.
pub struct Acquisition<B: Board> {
    registry: SensorRegistry<B>,
    snapshots: Vec<SensorSnapshot>,
    cycles: u64,
}

impl<B: Board> Acquisition<B> {
    pub fn new(arbiter: BusArbiter) -> Self {
        Self {
            registry: SensorRegistry::new(arbiter),
            snapshots: Vec::new(),
            cycles: 0,
        }
    }

    /// Rebuilds the driver set and resets every snapshot to "awaiting".
    pub fn rebuild(&mut self, board: &mut B, config: &DeviceConfig) {
        self.registry.rebuild(board, config);
        self.snapshots = self
            .registry
            .iter()
            .map(|sensor| SensorSnapshot::pending(sensor.params()))
            .collect();
    }

    /// Samples every active sensor once, or synthesizes readings in
    /// simulation mode. Offsets come from `config` and are applied to the
    /// fresh sample only.
    pub fn run_cycle<R: Rng>(&mut self, board: &mut B, config: &DeviceConfig, rng: &mut R) {
        self.cycles += 1;

        if config.simulation {
            self.snapshots = simulate(rng);
            tracing::debug!("cycle {}: simulated {} sensors", self.cycles, self.snapshots.len());
            return;
        }

        let (arbiter, sensors) = self.registry.parts_mut();
        let mut snapshots = Vec::with_capacity(sensors.len());

        for sensor in sensors.iter_mut() {
            let mut snapshot = sensor.sample(board, arbiter);

            if snapshot.valid {
                if let Some(slot) = config.sensors.get(snapshot.slot) {
                    snapshot.apply_offset(MeasurementKind::Temperature, slot.temperature_offset);
                    snapshot.apply_offset(MeasurementKind::Humidity, slot.humidity_offset);
                }
            } else {
                tracing::warn!(
                    "slot {} ({}): {}",
                    snapshot.slot,
                    snapshot.kind.label(),
                    snapshot.error.as_deref().unwrap_or_default()
                );
            }

            snapshots.push(snapshot);
        }

        self.snapshots = snapshots;

        tracing::debug!(
            "cycle {}: {}/{} sensors valid",
            self.cycles,
            self.snapshots.iter().filter(|s| s.valid).count(),
            self.snapshots.len()
        );
    }

    pub fn snapshots(&self) -> &[SensorSnapshot] {
        &self.snapshots
    }

    pub fn registry(&self) -> &SensorRegistry<B> {
        &self.registry
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

/// Plausible readings for a DHT22 on pin 4 and a BME280 on pin 5.
pub fn simulate<R: Rng>(rng: &mut R) -> Vec<SensorSnapshot> {
    let mut jitter = |tenths: i32| rng.random_range(-tenths..tenths) as f32 / 10.0;

    let dht = DriverParams::new(0, SensorKind::Dht22, 4, 0);
    let bme = DriverParams::new(1, SensorKind::Bme280, 5, 0);

    vec![
        SensorSnapshot::from_readings(
            &dht,
            vec![
                Reading::new(MeasurementKind::Temperature, 22.5 + jitter(20)),
                Reading::new(MeasurementKind::Humidity, 45.0 + jitter(50)),
            ],
        ),
        SensorSnapshot::from_readings(
            &bme,
            vec![
                Reading::new(MeasurementKind::Temperature, 24.1 + jitter(20)),
                Reading::new(MeasurementKind::Humidity, 40.0 + jitter(50)),
                Reading::new(MeasurementKind::Pressure, 1012.5 + jitter(100)),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sensorgate_drivers::mock::{MockBoard, dht_frame};

    use super::*;
    use crate::configs::SensorSlot;

    fn dht22_config(offset: f32) -> DeviceConfig {
        let mut config = DeviceConfig::default();
        config.sensors[0] = SensorSlot::new(SensorKind::Dht22, 4).with_offsets(offset, 0.0);
        config
    }

    #[test]
    fn test_pending_until_first_cycle() {
        let mut board = MockBoard::new();
        let mut acquisition = Acquisition::new(BusArbiter::new());

        acquisition.rebuild(&mut board, &dht22_config(0.0));

        let snapshot = &acquisition.snapshots()[0];
        assert!(!snapshot.valid);
        assert_eq!(snapshot.error.as_deref(), Some(sensorgate_drivers::AWAITING_FIRST_SAMPLE));
    }

    #[test]
    fn test_offsets_do_not_accumulate() {
        // 22.5 C, 45.0 %
        let mut board = MockBoard::new().with_dht_frame(4, dht_frame([0x01, 0xC2, 0x00, 0xE1]));
        let mut rng = StdRng::seed_from_u64(7);
        let config = dht22_config(-1.5);
        let mut acquisition = Acquisition::new(BusArbiter::new());
        acquisition.rebuild(&mut board, &config);

        for _ in 0..3 {
            acquisition.run_cycle(&mut board, &config, &mut rng);

            let snapshot = &acquisition.snapshots()[0];
            assert!((snapshot.value_of(MeasurementKind::Temperature).unwrap() - 21.0).abs() < 1e-4);
            assert!((snapshot.value_of(MeasurementKind::Humidity).unwrap() - 45.0).abs() < 1e-4);
        }
        assert_eq!(acquisition.cycles(), 3);
    }

    #[test]
    fn test_failed_sample_does_not_stop_sweep() {
        let mut board = MockBoard::new().with_digital(12, true);
        let mut rng = StdRng::seed_from_u64(7);
        let mut config = dht22_config(0.0);
        config.sensors[1] = SensorSlot::new(SensorKind::Pir, 12);

        let mut acquisition = Acquisition::new(BusArbiter::new());
        acquisition.rebuild(&mut board, &config);
        acquisition.run_cycle(&mut board, &config, &mut rng);

        let snapshots = acquisition.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert!(!snapshots[0].valid);
        assert!(snapshots[1].valid);
        assert_eq!(snapshots[1].value_of(MeasurementKind::Motion), Some(1.0));
    }

    #[test]
    fn test_simulation_skips_hardware() {
        let mut board = MockBoard::new();
        let events = board.events();
        let mut rng = StdRng::seed_from_u64(42);
        let mut config = dht22_config(0.0);
        config.simulation = true;

        let mut acquisition = Acquisition::new(BusArbiter::new());
        acquisition.rebuild(&mut board, &config);
        events.clear();
        acquisition.run_cycle(&mut board, &config, &mut rng);

        assert!(events.take().is_empty());
        assert_eq!(acquisition.snapshots().len(), 2);
    }

    #[test]
    fn test_simulated_readings_stay_in_band() {
        const BANDS: &[(usize, MeasurementKind, f32, f32)] = &[
            (0, MeasurementKind::Temperature, 22.5, 2.0),
            (0, MeasurementKind::Humidity, 45.0, 5.0),
            (1, MeasurementKind::Temperature, 24.1, 2.0),
            (1, MeasurementKind::Humidity, 40.0, 5.0),
            (1, MeasurementKind::Pressure, 1012.5, 10.0),
        ];

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let snapshots = simulate(&mut rng);
            assert_eq!(snapshots[0].pin, 4);
            assert_eq!(snapshots[1].kind, SensorKind::Bme280);

            for &(index, kind, center, spread) in BANDS {
                let value = snapshots[index].value_of(kind).unwrap();
                assert!((value - center).abs() <= spread + 1e-3, "{kind:?} = {value}");
            }
        }
    }
}
