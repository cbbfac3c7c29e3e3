mod config;
mod error;

pub use config::{AppConfig, AppConfigExt, DemoConfig, EngineConfig, SurfaceConfig, APP_NAME};
pub use error::ConfigError;
