mod backends;
mod channels;
mod defaults;


pub use backends::*;
pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CourierError;
use defaults::*;

/// Top-level Courier configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub courier: CourierConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub screenshot: ScreenshotConfig,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl CourierConfig {
    /// Expanded data directory.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.data_dir))
    }
}

/// Presence heartbeat: keeps the "composing" indicator alive during a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_presence_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_presence_interval_secs(),
        }
    }
}

/// File delivery queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Interval used when `/queue` is given no seconds argument.
    #[serde(default = "default_queue_interval_secs")]
    pub default_interval_secs: u64,
    /// Delivery attempts per file before it is skipped.
    #[serde(default = "default_queue_max_attempts")]
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_interval_secs: default_queue_interval_secs(),
            max_attempts: default_queue_max_attempts(),
        }
    }
}

/// External screenshot utility. Empty `command` disables `/screenshot`.
///
/// `{url}` and `{output}` are substituted inside each argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_screenshot_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            timeout_secs: default_screenshot_timeout_secs(),
        }
    }
}

impl ScreenshotConfig {
    pub fn is_configured(&self) -> bool {
        !self.command.trim().is_empty()
    }

    /// Arguments with placeholders filled in. No shell is involved.
    pub fn render_args(&self, url: &str, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{url}", url).replace("{output}", &output))
            .collect()
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if path == "~" {
        if let Some(home) = std::env::var_os("HOME") {
            return home.to_string_lossy().to_string();
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, CourierError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config {
            channel: ChannelConfig {
                console: Some(ConsoleConfig::default()),
            },
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| CourierError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CourierError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
