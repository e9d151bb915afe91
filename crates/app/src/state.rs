use std::{fs, path::PathBuf};

use common::orchestrator::OrchestratorConfig;
use common::vault::DEFAULT_CREATION_FEE;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "fangorn";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fee the local registry charges for `createVault`
    #[serde(default = "default_creation_fee")]
    pub creation_fee: u64,
    /// Default log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write logs to this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

fn default_creation_fee() -> u64 {
    DEFAULT_CREATION_FEE
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            creation_fee: default_creation_fee(),
            log_level: default_log_level(),
            log_dir: None,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the fangorn directory (~/.fangorn)
    pub fangorn_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the fangorn directory path (custom or default ~/.fangorn)
    pub fn fangorn_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new fangorn state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let fangorn_dir = Self::fangorn_dir(custom_path)?;
        let config_path = fangorn_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&fangorn_dir)?;

        let config = config.unwrap_or_else(|| AppConfig {
            log_dir: Some(fangorn_dir.join(LOGS_DIR_NAME)),
            ..Default::default()
        });
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            fangorn_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the fangorn directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let fangorn_dir = Self::fangorn_dir(custom_path)?;
        if !fangorn_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = fangorn_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            fangorn_dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("fangorn directory not initialized. Run 'fangorn init' first")]
    NotInitialized,

    #[error("fangorn directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::orchestrator::RetryPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fangorn");

        let state = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(state.config_path.exists());
        assert_eq!(state.config.log_dir, Some(dir.join(LOGS_DIR_NAME)));

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config, state.config);
    }

    #[test]
    fn test_init_twice() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fangorn");
        AppState::init(Some(dir.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_not_initialized() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().to_path_buf())),
            Err(StateError::MissingFile(_))
        ));
    }

    #[test]
    fn test_custom_config_round_trips() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fangorn");
        let mut config = AppConfig {
            creation_fee: 42,
            log_level: "debug".to_string(),
            ..Default::default()
        };
        config.orchestrator.registry = "staging-registry".to_string();
        config.orchestrator.retry = RetryPolicy::immediate(2);

        AppState::init(Some(dir.clone()), Some(config.clone())).unwrap();
        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "creation_fee = 7\n\n[orchestrator]\nregistry = \"other\"\n",
        )
        .unwrap();

        let state = AppState::load(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(state.config.creation_fee, 7);
        assert_eq!(state.config.log_level, "warn");
        assert_eq!(state.config.orchestrator.registry, "other");
        assert_eq!(state.config.orchestrator.retry, RetryPolicy::default());
    }
}
