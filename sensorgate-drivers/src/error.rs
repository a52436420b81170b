use core::fmt;

use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverFault {
    DeviceNotFound { address: u8 },
    UnexpectedDevice { address: u8, id: u8 },
    BusError,
    ChecksumMismatch,
    NotReady,
    Timeout,
    NoPresencePulse,
    Unsupported,
}

impl fmt::Display for DriverFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverFault::DeviceNotFound { address } => {
                write!(f, "No device responding at 0x{address:02X}")
            }
            DriverFault::UnexpectedDevice { address, id } => {
                write!(f, "Unexpected device id 0x{id:02X} at 0x{address:02X}")
            }
            DriverFault::BusError => write!(f, "Bus error"),
            DriverFault::ChecksumMismatch => write!(f, "Checksum mismatch"),
            DriverFault::NotReady => write!(f, "Device not ready"),
            DriverFault::Timeout => write!(f, "Timeout error"),
            DriverFault::NoPresencePulse => write!(f, "No presence pulse on 1-Wire bus"),
            DriverFault::Unsupported => write!(f, "Operation not supported by board"),
        }
    }
}

impl core::error::Error for DriverFault {}

impl DriverFault {
    /// Maps a HAL I2C error onto a fault, keeping the address for NACKs.
    pub fn from_i2c<E: i2c::Error>(address: u8, err: E) -> Self {
        match err.kind() {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            | ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown) => {
                DriverFault::DeviceNotFound { address }
            }
            _ => DriverFault::BusError,
        }
    }
}

pub type Result<T> = core::result::Result<T, DriverFault>;

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_nack_maps_to_device_not_found() {
        let fault = DriverFault::from_i2c(0x76, ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        assert_eq!(fault, DriverFault::DeviceNotFound { address: 0x76 });
        assert_eq!(fault.to_string(), "No device responding at 0x76");

        let fault = DriverFault::from_i2c(0x76, ErrorKind::ArbitrationLoss);
        assert_eq!(fault, DriverFault::BusError);
    }
}
