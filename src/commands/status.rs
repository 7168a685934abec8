//! `/status` reply formatting.

use courier_core::config::BackendKind;
use std::time::Duration;

/// Point-in-time view of the gateway for `/status`.
pub struct StatusSnapshot {
    pub backend: BackendKind,
    pub history_len: usize,
    pub round_in_flight: bool,
    pub queue_active: bool,
    pub queue_sent: usize,
    pub queue_total: usize,
    pub uptime: Duration,
}

pub fn format_status(s: &StatusSnapshot) -> String {
    let secs = s.uptime.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let secs = secs % 60;

    let queue = if s.queue_active {
        format!("active ({}/{} sent)", s.queue_sent, s.queue_total)
    } else {
        "inactive".to_string()
    };

    format!(
        "Courier status\n\
         Backend: {}\n\
         History: {} entries\n\
         AI round: {}\n\
         Queue: {queue}\n\
         Uptime: {hours}h {minutes}m {secs}s",
        s.backend.display_name(),
        s.history_len,
        if s.round_in_flight { "in flight" } else { "idle" },
    )
}
