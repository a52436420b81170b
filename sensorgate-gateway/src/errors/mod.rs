pub mod bus;
pub mod collector;
pub mod gateway;
pub mod ota;
pub mod store;

pub use bus::BusError;
pub use collector::CollectorError;
pub use gateway::GatewayError;
pub use ota::OtaError;
pub use store::StoreError;
