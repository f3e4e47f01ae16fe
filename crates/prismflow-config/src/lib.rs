pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{EndpointSettings, PollOverride, Settings};

use std::path::PathBuf;

/// Config directory of PrismFlow (`~/.config/prismflow`), created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("prismflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the PrismFlow config file
///
/// Search order:
/// 1. `PRISMFLOW_CONFIG` environment variable (direct path)
/// 2. current directory: prismflow.local.yaml, prismflow.yaml, .prismflow.yaml
/// 3. ~/.config/prismflow/config.yaml (global config)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("PRISMFLOW_CONFIG") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["prismflow.local.yaml", "prismflow.yaml", ".prismflow.yaml"];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("prismflow").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
