use crate::error::{ForceRmError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// forcerm user settings
///
/// Stored in ~/.forcerm/config.toml. A missing file means defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for run logs, relative to the working directory unless absolute
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Account that receives ownership and full control during remediation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Ask before deleting anything
    #[serde(default = "default_confirm")]
    pub confirm: bool,

    /// Log how many files each directory holds before deleting it
    #[serde(default = "default_count_files")]
    pub count_files: bool,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_confirm() -> bool {
    true
}

fn default_count_files() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            identity: None,
            confirm: default_confirm(),
            count_files: default_count_files(),
        }
    }
}

impl Config {
    /// Config directory (~/.forcerm)
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".forcerm")
    }

    /// Config file path (~/.forcerm/config.toml)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ForceRmError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ForceRmError::ConfigError(e.to_string()))?;
        fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write defaults, returning where they went
    pub fn init() -> Result<PathBuf> {
        Self::default().save()?;
        Ok(Self::config_path())
    }

    /// Configured identity, else the account running this process.
    pub fn resolve_identity(&self) -> String {
        if let Some(identity) = self.identity.as_deref().filter(|s| !s.trim().is_empty()) {
            return identity.to_string();
        }
        current_account()
    }
}

fn current_account() -> String {
    let vars: &[&str] = if cfg!(windows) {
        &["USERNAME", "USER"]
    } else {
        &["USER", "LOGNAME", "USERNAME"]
    };

    vars.iter()
        .filter_map(|v| std::env::var(v).ok())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| "root".to_string())
}
