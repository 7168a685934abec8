//! Default value functions used by serde for config deserialization.

use super::BackendKind;

pub fn default_name() -> String {
    "courier".to_string()
}

pub fn default_data_dir() -> String {
    "~/.courier".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_backend() -> BackendKind {
    BackendKind::Claude
}

pub fn default_true() -> bool {
    true
}

pub fn default_claude_command() -> String {
    "claude".to_string()
}

pub fn default_claude_args() -> Vec<String> {
    vec!["-p".to_string(), "--dangerously-skip-permissions".to_string()]
}

pub fn default_qwen_command() -> String {
    "qwen".to_string()
}

pub fn default_qwen_args() -> Vec<String> {
    vec!["--yolo".to_string(), "-p".to_string()]
}

pub fn default_backend_timeout_secs() -> u64 {
    600
}

/// 10 MiB of captured output per invocation.
pub fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

pub fn default_presence_interval_secs() -> u64 {
    5
}

pub fn default_queue_interval_secs() -> u64 {
    60
}

pub fn default_queue_max_attempts() -> u32 {
    3
}

pub fn default_screenshot_timeout_secs() -> u64 {
    60
}

pub fn default_console_target() -> String {
    "self".to_string()
}
