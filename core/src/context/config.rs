//! Application configuration
//!
//! This module re-exports shared types from danmaku-types and provides
//! persistence for AppConfig.

use std::path::Path;

pub use danmaku_types::{AppConfig, DemoConfig, EngineConfig, SurfaceConfig};

use super::error::ConfigError;

/// Name used for the per-user config directory
pub const APP_NAME: &str = "danmaku";
const CONFIG_NAME: &str = "config";

/// Extension trait for AppConfig persistence
pub trait AppConfigExt: Sized {
    /// Load the user config, falling back to defaults when it is missing or unreadable
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn load_path(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_path(&self, path: &Path) -> Result<(), ConfigError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn load_path(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn save_path(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self).map_err(ConfigError::Save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use danmaku_types::SpeedMode;

    fn temp_config_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("danmaku-config-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_save_then_load_path() {
        let path = temp_config_path("roundtrip.toml");
        let mut config = AppConfig::default();
        config.engine.speed_mode = SpeedMode::legacy();
        config.surface.width = 720;

        config.save_path(&path).unwrap();
        let loaded = AppConfig::load_path(&path).unwrap();

        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = temp_config_path("missing/created.toml");
        let _ = std::fs::remove_file(&path);

        let loaded = AppConfig::load_path(&path).unwrap();

        assert_eq!(loaded, AppConfig::default());
        let _ = std::fs::remove_file(&path);
    }
}
