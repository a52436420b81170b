mod acquisition_service;
mod command_service;
mod ota_service;
mod registry_service;
mod system_service;
mod telemetry_service;
mod transport;

pub use acquisition_service::*;
pub use command_service::*;
pub use ota_service::*;
pub use registry_service::*;
pub use system_service::*;
pub use telemetry_service::*;
pub use transport::*;
