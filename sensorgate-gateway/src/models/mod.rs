mod command;
mod telemetry;

pub use command::{Ack, Command, ConfigPatch};
pub use telemetry::{Envelope, HttpRecord, SystemHealth};
