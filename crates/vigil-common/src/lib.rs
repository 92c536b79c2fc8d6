pub mod config;
pub mod logging;

pub const APP_NAME: &str = "vigil";

pub use config::{ConfigError, DocumentConfig, VigilConfig};
