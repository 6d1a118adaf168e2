use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub container_path: PathBuf,
    pub wrapped_secret_path: PathBuf,
    #[serde(default = "default_true")]
    pub enable_biometric: bool,
    #[serde(default = "default_biometric_timeout")]
    pub biometric_timeout_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_password_attempts: u32,
    #[serde(default)]
    pub recreate_on_load_failure: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_biometric_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        if !config_path.exists() {
            let default_config = Self::default_with_dir(config_dir);
            default_config.save(config_dir)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self, config_dir: &Path) -> Result<()> {
        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    fn default_with_dir(config_dir: &Path) -> Self {
        Self {
            container_path: config_dir.join("credentials.pcs"),
            wrapped_secret_path: config_dir.join("biometric.json"),
            enable_biometric: true,
            biometric_timeout_seconds: default_biometric_timeout(),
            max_password_attempts: default_max_attempts(),
            recreate_on_load_failure: false,
            log_level: default_log_level(),
        }
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    let config_dir = home.join(".pqc-certstore");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    Ok(config_dir)
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Some(rest) => {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(rest.trim_start_matches('/')))
        }
        None => Ok(PathBuf::from(path)),
    }
}
