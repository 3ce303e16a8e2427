pub mod auth;
pub mod config;
pub mod error;
pub mod version;

pub use config::{GatewayConfig, UpstreamConfig};
pub use error::GatewayError;
pub use version::ApiVersion;
