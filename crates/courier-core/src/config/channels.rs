use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub console: Option<ConsoleConfig>,
}

/// Console channel config: the terminal acts as the self-channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Self-channel id used as the reply target.
    #[serde(default = "default_console_target")]
    pub target: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: default_console_target(),
        }
    }
}
