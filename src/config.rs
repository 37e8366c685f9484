use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the exif-manager library and CLI.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_manager::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.defaults.copyright = Some("© 2024 Jane Doe".into());
/// config.output.overwrite = true;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging behavior.
    pub logging: LoggingConfig,
    /// How modified files are saved.
    pub output: OutputConfig,
    /// Values stamped onto every file the CLI writes.
    pub defaults: DefaultFields,
}

/// Logging behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// If `false`, the manager does not log file loads and saves.
    pub enabled: bool,
    /// Optional path to a log file (CLI only). Logs go to stderr when unset.
    pub log_file: Option<String>,
}

/// Save behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, overwrite the target file. If `false`, save as `name(n).ext`.
    pub overwrite: bool,
    /// If `true`, create a `.bak` copy before overwriting a file in place.
    pub backup_originals: bool,
}

/// Fields written by the CLI whenever it saves a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultFields {
    /// ExifVersion written alongside other changes.
    pub exif_version: String,
    pub software: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: None,
        }
    }
}

impl Default for DefaultFields {
    fn default() -> Self {
        Self {
            exif_version: "0220".to_string(),
            software: None,
            artist: None,
            copyright: None,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        match Self::read(&config_path)? {
            Some(config) => Ok(config),
            None => {
                log::warn!(
                    "Config file not found at {}. Using defaults.",
                    config_path.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Read and parse `path`. `None` if the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(Some(config))
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
