use serde::{Deserialize, Serialize};
use std::fmt;

use super::defaults::*;

/// The two interchangeable AI backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Batch CLI: runs to completion, full output at once.
    Claude,
    /// Streaming CLI: stays resident and emits output incrementally.
    Qwen,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Claude, BackendKind::Qwen];

    /// Short name used in history keys, logs, and notifications.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Qwen => "qwen",
        }
    }

    /// Display name used in chat replies.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Qwen => "Qwen",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend")]
    pub default: BackendKind,
    #[serde(default = "CliConfig::claude")]
    pub claude: CliConfig,
    #[serde(default = "CliConfig::qwen")]
    pub qwen: CliConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            default: default_backend(),
            claude: CliConfig::claude(),
            qwen: CliConfig::qwen(),
        }
    }
}

impl BackendConfig {
    pub fn cli(&self, kind: BackendKind) -> &CliConfig {
        match kind {
            BackendKind::Claude => &self.claude,
            BackendKind::Qwen => &self.qwen,
        }
    }
}

/// How to launch one AI CLI. The prompt is appended as the last argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock limit per invocation.
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
    /// Cap on captured stdout + stderr; exceeding it fails the round.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Working directory for the subprocess (`~` expanded).
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl CliConfig {
    pub fn claude() -> Self {
        Self {
            command: default_claude_command(),
            args: default_claude_args(),
            timeout_secs: default_backend_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            working_dir: None,
        }
    }

    pub fn qwen() -> Self {
        Self {
            command: default_qwen_command(),
            args: default_qwen_args(),
            timeout_secs: default_backend_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            working_dir: None,
        }
    }
}
