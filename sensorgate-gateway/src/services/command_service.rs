use crate::configs::DeviceConfig;
use crate::models::{Ack, Command};

/// What the runtime must do after a command has been applied to the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Restart,
    BeginUpdate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub ack: Ack,
    pub effect: Effect,
    /// The config changed and must be written back
    pub persist: bool,
}

/// Applies `command` to `config`. Never touches the sensor registry.
pub fn interpret(command: &Command, config: &mut DeviceConfig) -> Outcome {
    match command {
        Command::Restart => Outcome {
            ack: Ack::Restarting,
            effect: Effect::Restart,
            persist: false,
        },
        Command::ToggleSimulation => {
            config.simulation = !config.simulation;
            tracing::info!("simulation {}", if config.simulation { "enabled" } else { "disabled" });

            Outcome {
                ack: if config.simulation { Ack::SimOn } else { Ack::SimOff },
                effect: Effect::None,
                persist: true,
            }
        }
        Command::TriggerUpdate => match config.firmware_url.trim() {
            "" => {
                tracing::warn!("update requested but no firmware URL is configured");
                Outcome {
                    ack: Ack::UpdateFailedNoUrl,
                    effect: Effect::None,
                    persist: false,
                }
            }
            url => Outcome {
                ack: Ack::Updating,
                effect: Effect::BeginUpdate(url.to_string()),
                persist: false,
            },
        },
        Command::PatchConfig(patch) => {
            patch.apply(config);
            tracing::info!("config patched: {:?}", patch);

            Outcome {
                ack: Ack::ConfigUpdated,
                effect: Effect::None,
                persist: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConfigPatch;

    #[test]
    fn test_toggle_flips_and_acks_new_state() {
        let mut config = DeviceConfig::default();

        let outcome = interpret(&Command::ToggleSimulation, &mut config);
        assert!(config.simulation);
        assert_eq!(outcome.ack, Ack::SimOn);
        assert!(outcome.persist);

        let outcome = interpret(&Command::ToggleSimulation, &mut config);
        assert!(!config.simulation);
        assert_eq!(outcome.ack, Ack::SimOff);
    }

    #[test]
    fn test_update_requires_url() {
        let mut config = DeviceConfig::default();
        config.firmware_url = "   ".into();

        let outcome = interpret(&Command::TriggerUpdate, &mut config);
        assert_eq!(outcome.ack, Ack::UpdateFailedNoUrl);
        assert_eq!(outcome.effect, Effect::None);

        config.firmware_url = "http://fw.local/app.bin".into();
        let outcome = interpret(&Command::TriggerUpdate, &mut config);
        assert_eq!(outcome.ack, Ack::Updating);
        assert_eq!(outcome.effect, Effect::BeginUpdate("http://fw.local/app.bin".into()));
    }

    #[test]
    fn test_restart_and_patch() {
        let mut config = DeviceConfig::default();

        let outcome = interpret(&Command::Restart, &mut config);
        assert_eq!((outcome.ack, outcome.effect, outcome.persist), (Ack::Restarting, Effect::Restart, false));

        let patch = ConfigPatch {
            utc_offset: Some(-18000),
            ..ConfigPatch::default()
        };
        let outcome = interpret(&Command::PatchConfig(patch), &mut config);
        assert_eq!(outcome.ack, Ack::ConfigUpdated);
        assert!(outcome.persist);
        assert_eq!(config.utc_offset, -18000);
    }
}
