#![no_std]

extern crate alloc;

pub mod board;
pub mod bus;
pub mod checksum;
pub mod driver;
pub mod error;
pub mod kind;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod sensor;
pub mod types;

pub use board::*;
pub use bus::{BusArbiter, MUX_ADDRESS, MuxChannel, scan};
pub use driver::*;
pub use error::*;
pub use kind::*;
pub use types::*;

pub use embedded_hal;
