//! Presence heartbeat: keeps the "composing" indicator alive during a round.
//!
//! Transports drop the indicator after roughly 25 seconds, so it is re-sent on
//! a short fixed period until the bracketed operation ends.

use courier_core::{message::Presence, traits::Channel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Heartbeat {
    channel: Arc<dyn Channel>,
    target: String,
    interval: Duration,
    /// `Some` while running.
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new(channel: Arc<dyn Channel>, target: &str, interval: Duration) -> Self {
        Self {
            channel,
            target: target.to_string(),
            interval,
            ticker: Mutex::new(None),
        }
    }

    /// Emit `Composing` now and every `interval` after. No-op if running.
    pub async fn start(&self) {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            return;
        }

        if let Err(e) = self
            .channel
            .send_presence(&self.target, Presence::Composing)
            .await
        {
            debug!("[{}] presence failed: {e}", self.channel.name());
        }

        let channel = self.channel.clone();
        let target = self.target.clone();
        let mut ticks =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        *ticker = Some(tokio::spawn(async move {
            loop {
                ticks.tick().await;
                if channel
                    .send_presence(&target, Presence::Composing)
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    /// Cancel the timer and emit one `Paused`. Idempotent.
    pub async fn stop(&self) {
        let Some(handle) = self.ticker.lock().await.take() else {
            return;
        };
        handle.abort();
        if let Err(e) = self
            .channel
            .send_presence(&self.target, Presence::Paused)
            .await
        {
            debug!("[{}] presence failed: {e}", self.channel.name());
        }
    }

    #[cfg(test)]
    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::MockChannel;

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_emits_immediately_then_periodically() {
        let channel = Arc::new(MockChannel::default());
        let hb = Heartbeat::new(channel.clone(), "self", Duration::from_secs(5));

        hb.start().await;
        assert_eq!(channel.presence_count(Presence::Composing), 1);
        assert!(hb.is_running().await);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(channel.presence_count(Presence::Composing), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(channel.presence_count(Presence::Composing), 3);

        hb.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_does_not_double_the_timer() {
        let channel = Arc::new(MockChannel::default());
        let hb = Heartbeat::new(channel.clone(), "self", Duration::from_secs(5));

        hb.start().await;
        hb.start().await;
        assert_eq!(channel.presence_count(Presence::Composing), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(channel.presence_count(Presence::Composing), 2);
        hb.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_signals() {
        let channel = Arc::new(MockChannel::default());
        let hb = Heartbeat::new(channel.clone(), "self", Duration::from_secs(5));

        hb.start().await;
        hb.stop().await;
        assert!(!hb.is_running().await);
        assert_eq!(channel.presence_count(Presence::Composing), 1);
        assert_eq!(channel.presence_count(Presence::Paused), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(channel.presence_count(Presence::Composing), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let channel = Arc::new(MockChannel::default());
        let hb = Heartbeat::new(channel.clone(), "self", Duration::from_secs(5));

        hb.stop().await;
        assert_eq!(channel.presence_count(Presence::Paused), 0);

        hb.start().await;
        hb.stop().await;
        hb.stop().await;
        assert_eq!(channel.presence_count(Presence::Paused), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let channel = Arc::new(MockChannel::default());
        {
            let hb = Heartbeat::new(channel.clone(), "self", Duration::from_secs(5));
            hb.start().await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(channel.presence_count(Presence::Composing), 1);
    }
}
