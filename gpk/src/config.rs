//! Gamepacks configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform data/config roots
pub const APP_DIR: &str = "gamepacks";

/// Main gamepacks configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote index and sync schedule
    pub sync: SyncConfig,

    /// Pack directories
    pub paths: PathsConfig,

    /// Trust root configuration
    pub trust: TrustConfig,

    /// Size and count guard-rails
    pub limits: LimitsConfig,

    /// Window title debounce
    pub detect: DetectConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./gamepacks.yml
        let local_config = PathBuf::from("gamepacks.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/gamepacks/gamepacks.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(APP_DIR).join("gamepacks.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed: a broken config file is reported later by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut v = vec![PathBuf::from("gamepacks.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    v.push(config_dir.join(APP_DIR).join("gamepacks.yml"));
                }
                v
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Path of the optional trust key override
    ///
    /// Defaults to `public-key.pem` inside the machine packs directory.
    pub fn key_override_path(&self) -> PathBuf {
        self.trust
            .public_key_override
            .clone()
            .unwrap_or_else(|| self.paths.machine_packs_dir.join("public-key.pem"))
    }
}

/// Remote index and schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL the index and artifacts are served from
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Index document path relative to the base URL
    #[serde(rename = "index-path")]
    pub index_path: String,

    /// Interval between scheduled cycles in seconds (0 = one-shot only)
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Delay before the first scheduled cycle in seconds
    #[serde(rename = "initial-delay-secs")]
    pub initial_delay_secs: u64,

    /// HTTP request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "https://packs.gmentor.ai".to_string(),
            index_path: "index.json".to_string(),
            interval_secs: 6 * 60 * 60,
            initial_delay_secs: 5,
            timeout_secs: 20,
        }
    }
}

impl SyncConfig {
    /// Full URL of the remote index
    pub fn index_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.index_path.trim_start_matches('/')
        )
    }

    /// Scheduled interval, `None` in one-shot mode
    pub fn interval(&self) -> Option<Duration> {
        if self.interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.interval_secs))
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pack directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Bundled, machine-level packs (loaded first)
    #[serde(rename = "machine-packs-dir")]
    pub machine_packs_dir: PathBuf,

    /// User-writable packs maintained by sync (loaded second, overrides)
    #[serde(rename = "user-packs-dir")]
    pub user_packs_dir: PathBuf,

    /// Localization bundles maintained by sync
    #[serde(rename = "localization-dir")]
    pub localization_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        // Bundled packs live next to the executable
        let machine_packs_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join("packs")))
            .unwrap_or_else(|| PathBuf::from("packs"));

        // Use XDG data directory (~/.local/share/gamepacks on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".gamepacks"));

        Self {
            machine_packs_dir,
            user_packs_dir: data_dir.join("packs"),
            localization_dir: data_dir.join("localization"),
        }
    }
}

/// Trust root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// PEM public key replacing the embedded one
    #[serde(rename = "public-key-override")]
    pub public_key_override: Option<PathBuf>,
}

/// Size and count guard-rails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest artifact accepted for verification, in bytes
    #[serde(rename = "max-artifact-bytes")]
    pub max_artifact_bytes: usize,

    /// Categories kept per pack
    #[serde(rename = "max-categories")]
    pub max_categories: usize,

    /// OCR excerpt cap in characters
    #[serde(rename = "ocr-max-chars")]
    pub ocr_max_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_artifact_bytes: 512 * 1024,
            max_categories: 16,
            ocr_max_chars: 200,
        }
    }
}

/// Window title debounce
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// How long a title must stay unchanged before it counts, in seconds
    #[serde(rename = "debounce-secs")]
    pub debounce_secs: u64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self { debounce_secs: 20 }
    }
}

impl DetectConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }
}
