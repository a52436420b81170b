mod http;
mod mqtt;

pub use http::*;
pub use mqtt::*;
