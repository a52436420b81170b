use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::configs;
use crate::models::SystemHealth;

pub type MacAddress = [u8; 6];

const RESET_MARKER: &str = "reset_reason";
const POWER_ON: &str = "Power on";

/// Platform facts and restart control.
pub trait System: Send {
    /// Sampled fresh on every call.
    fn health(&self) -> SystemHealth;

    fn hardware_address(&self) -> MacAddress;

    /// Records why the next boot happens. Called right before the process
    /// gives up control.
    fn prepare_restart(&self, reason: &str);
}

/// Last three MAC bytes as uppercase hex.
pub fn adoption_code(mac: &MacAddress) -> String {
    format!("{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5])
}

/// Parses `AA:BB:CC:DD:EE:FF` (or `-` separated).
pub fn parse_mac(text: &str) -> Option<MacAddress> {
    let mut mac = [0u8; 6];
    let mut parts = text.trim().split([':', '-']);

    for byte in mac.iter_mut() {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }

    parts.next().is_none().then_some(mac)
}

/// Linux host implementation backed by `/proc` and `/sys`.
pub struct HostSystem {
    started: Instant,
    state_dir: PathBuf,
    mac: MacAddress,
    reset_reason: String,
}

impl HostSystem {
    /// Consumes the reset marker left by the previous run, if any.
    pub fn new(settings: &configs::System) -> Self {
        let state_dir = PathBuf::from(&settings.state_dir);

        let mac = settings
            .hardware_address
            .as_deref()
            .and_then(|text| {
                let mac = parse_mac(text);
                if mac.is_none() {
                    tracing::warn!("ignoring malformed hardware address {:?}", text);
                }
                mac
            })
            .or_else(interface_address)
            .unwrap_or_default();

        let marker = state_dir.join(RESET_MARKER);
        let reset_reason = match fs::read_to_string(&marker) {
            Ok(reason) => {
                if let Err(e) = fs::remove_file(&marker) {
                    tracing::warn!("failed to clear reset marker: {}", e);
                }
                reason.trim().to_string()
            }
            Err(_) => POWER_ON.to_string(),
        };

        Self {
            started: Instant::now(),
            state_dir,
            mac,
            reset_reason,
        }
    }
}

impl System for HostSystem {
    fn health(&self) -> SystemHealth {
        SystemHealth {
            signal_strength: fs::read_to_string("/proc/net/wireless")
                .ok()
                .and_then(|text| wireless_level(&text))
                .unwrap_or(0),
            uptime_secs: self.started.elapsed().as_secs(),
            free_memory_bytes: fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|text| available_memory(&text))
                .unwrap_or(0),
            last_reset_reason: self.reset_reason.clone(),
        }
    }

    fn hardware_address(&self) -> MacAddress {
        self.mac
    }

    fn prepare_restart(&self, reason: &str) {
        let marker = self.state_dir.join(RESET_MARKER);
        let written = fs::create_dir_all(&self.state_dir).and_then(|_| fs::write(&marker, reason));

        if let Err(e) = written {
            tracing::warn!("failed to record reset reason at {}: {}", marker.display(), e);
        }
    }
}

/// First non-loopback, non-zero interface address.
fn interface_address() -> Option<MacAddress> {
    let mut entries: Vec<_> = fs::read_dir("/sys/class/net").ok()?.flatten().map(|e| e.path()).collect();
    entries.sort();

    entries
        .iter()
        .filter(|path| path.file_name().is_some_and(|name| name != "lo"))
        .filter_map(|path| read_mac(path))
        .find(|mac| mac.iter().any(|&b| b != 0))
}

fn read_mac(interface: &Path) -> Option<MacAddress> {
    parse_mac(&fs::read_to_string(interface.join("address")).ok()?)
}

/// Signal level (dBm) of the first interface listed in `/proc/net/wireless`.
fn wireless_level(text: &str) -> Option<i32> {
    let line = text.lines().nth(2)?;
    let level = line.split_whitespace().nth(3)?;
    level.trim_end_matches('.').parse::<f32>().ok().map(|dbm| dbm as i32)
}

fn available_memory(text: &str) -> Option<u64> {
    text.lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adoption_code_uses_last_three_bytes() {
        assert_eq!(adoption_code(&[0x24, 0x6F, 0x28, 0xA1, 0x0B, 0xC3]), "A10BC3");
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(parse_mac("24:6f:28:a1:b2:c3\n"), Some([0x24, 0x6F, 0x28, 0xA1, 0xB2, 0xC3]));
        assert_eq!(parse_mac("24-6F-28-A1-B2-C3"), Some([0x24, 0x6F, 0x28, 0xA1, 0xB2, 0xC3]));
        assert_eq!(parse_mac("24:6F:28:A1:B2"), None);
        assert_eq!(parse_mac("24:6F:28:A1:B2:C3:00"), None);
        assert_eq!(parse_mac("zz:6F:28:A1:B2:C3"), None);
    }

    #[test]
    fn test_proc_parsers() {
        let wireless = "Inter-| sta-|   Quality        |   Discarded packets\n \
                        face | tus | link level noise |  nwid  crypt   frag\n \
                        wlan0: 0000   54.  -56.  -256        0      0      0\n";
        assert_eq!(wireless_level(wireless), Some(-56));
        assert_eq!(wireless_level("header only\n"), None);

        let meminfo = "MemTotal:        8000000 kB\nMemFree:          100000 kB\nMemAvailable:     250000 kB\n";
        assert_eq!(available_memory(meminfo), Some(256_000_000));
    }

    #[test]
    fn test_reset_reason_survives_one_restart() {
        let dir = tempfile::tempdir().unwrap();
        let settings = configs::System {
            state_dir: dir.path().display().to_string(),
            restart_settle_ms: 0,
            hardware_address: Some("02:00:00:12:34:56".into()),
        };

        let first = HostSystem::new(&settings);
        assert_eq!(first.health().last_reset_reason, POWER_ON);
        assert_eq!(adoption_code(&first.hardware_address()), "123456");
        first.prepare_restart("Remote restart");

        let second = HostSystem::new(&settings);
        assert_eq!(second.health().last_reset_reason, "Remote restart");

        let third = HostSystem::new(&settings);
        assert_eq!(third.health().last_reset_reason, POWER_ON);
    }
}
