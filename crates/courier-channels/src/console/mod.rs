//! Console channel: the terminal acts as the self-channel.
//!
//! Each stdin line is one inbound message. `@file <path> [caption]` attaches a
//! file from disk. Replies, media deliveries and presence changes are written
//! to stdout.

mod channel;
mod input;


use courier_core::config::ConsoleConfig;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::{Mutex, Notify};

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Console channel over any line reader and writer (stdin/stdout by default).
pub struct ConsoleChannel {
    config: ConsoleConfig,
    /// Taken by `start()`; a second start has nothing to read.
    input: Mutex<Option<Reader>>,
    output: Arc<Mutex<Writer>>,
    shutdown: Arc<Notify>,
}

impl ConsoleChannel {
    /// Console channel bound to the process stdin and stdout.
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_io(
            config,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }

    /// Console channel over arbitrary I/O.
    pub fn with_io<R, W>(config: ConsoleConfig, input: R, output: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            config,
            input: Mutex::new(Some(Box::new(input))),
            output: Arc::new(Mutex::new(Box::new(output))),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Self-channel id used as sender and reply target.
    pub fn target(&self) -> &str {
        &self.config.target
    }
}
