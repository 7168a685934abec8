//! File delivery queue: sends a folder's files one per interval.
//!
//! States are `Idle` and `Active`. `start` delivers the first file right away
//! and arms one repeating timer; a new `start` replaces the previous run
//! outright. A file stays at the head of `pending` until it is delivered or
//! has failed `max_attempts` times, after which it is skipped.

use super::notifier::Notifier;
use courier_core::{error::CourierError, message::Notification, traits::Channel};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};


/// Observable queue state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub active: bool,
    pub folder: PathBuf,
    pub interval: Duration,
    pub total_files: usize,
    pub sent_files: usize,
    pub sent_list: Vec<String>,
    pub skipped: Vec<String>,
    /// File names still pending, in delivery order.
    pub remaining: Vec<String>,
}

impl QueueSnapshot {
    pub fn describe(&self) -> String {
        if !self.active && self.total_files == 0 {
            return "Queue inactive.".to_string();
        }
        let mut out = format!(
            "Queue {}: {}/{} sent from {} every {}s",
            if self.active { "active" } else { "stopped" },
            self.sent_files,
            self.total_files,
            self.folder.display(),
            self.interval.as_secs(),
        );
        if !self.sent_list.is_empty() {
            out.push_str(&format!("\nSent: {}", self.sent_list.join(", ")));
        }
        if !self.skipped.is_empty() {
            out.push_str(&format!("\nSkipped: {}", self.skipped.join(", ")));
        }
        if !self.remaining.is_empty() {
            out.push_str(&format!(
                "\nRemaining ({}): {}",
                self.remaining.len(),
                self.remaining.join(", ")
            ));
        }
        out
    }
}

#[derive(Default)]
struct QueueState {
    active: bool,
    /// Bumped by every `start`; a tick from an older run never touches state.
    generation: u64,
    folder: PathBuf,
    interval: Duration,
    total_files: usize,
    sent_files: usize,
    sent_list: Vec<String>,
    skipped: Vec<String>,
    pending: VecDeque<PathBuf>,
    /// Failed attempts for the file at the head of `pending`.
    head_failures: u32,
    cancel: Option<CancellationToken>,
    /// Counts of a stopped or finished run, kept for one `status` call.
    retained: bool,
}

impl QueueState {
    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            active: self.active,
            folder: self.folder.clone(),
            interval: self.interval,
            total_files: self.total_files,
            sent_files: self.sent_files,
            sent_list: self.sent_list.clone(),
            skipped: self.skipped.clone(),
            remaining: self.pending.iter().map(|p| file_name(p)).collect(),
        }
    }

    fn finish(&mut self) {
        self.active = false;
        self.retained = true;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// Where and how one run delivers.
struct Run {
    state: Arc<Mutex<QueueState>>,
    channel: Arc<dyn Channel>,
    target: String,
    generation: u64,
    max_attempts: u32,
    notifier: Notifier,
}

#[derive(Debug, PartialEq, Eq)]
enum Tick {
    Continue,
    Finished,
}

pub struct FileQueue {
    state: Arc<Mutex<QueueState>>,
    max_attempts: u32,
    notifier: Notifier,
}

impl FileQueue {
    pub fn new(max_attempts: u32, notifier: Notifier) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            max_attempts: max_attempts.max(1),
            notifier,
        }
    }

    /// Start (or restart) delivering `folder`. The first file is sent before
    /// this returns.
    pub async fn start(
        &self,
        folder: &Path,
        interval: Duration,
        channel: Arc<dyn Channel>,
        target: &str,
    ) -> Result<QueueSnapshot, CourierError> {
        let files = list_files(folder)?;
        let total = files.len();

        let generation = {
            let mut state = self.state.lock().await;
            if let Some(old) = state.cancel.take() {
                old.cancel();
                info!("queue: replacing active run for {}", state.folder.display());
            }
            let generation = state.generation + 1;
            *state = QueueState {
                active: true,
                generation,
                folder: folder.to_path_buf(),
                interval,
                total_files: total,
                pending: files.into(),
                cancel: Some(CancellationToken::new()),
                ..Default::default()
            };
            generation
        };
        info!(
            "queue: {} files from {} every {}s",
            total,
            folder.display(),
            interval.as_secs()
        );

        let run = Arc::new(Run {
            state: self.state.clone(),
            channel,
            target: target.to_string(),
            generation,
            max_attempts: self.max_attempts,
            notifier: self.notifier.clone(),
        });

        if run.tick().await == Tick::Continue {
            let cancel = self.state.lock().await.cancel.clone();
            if let Some(cancel) = cancel {
                spawn_ticker(run, interval, cancel);
            }
        }

        Ok(self.state.lock().await.snapshot())
    }

    /// Cancel the timer and drop pending files. Returns the final state if a
    /// run was active.
    ///
    /// A delivery already in progress is not interrupted.
    pub async fn stop(&self) -> Option<QueueSnapshot> {
        let mut state = self.state.lock().await;
        if !state.active {
            return None;
        }
        state.pending.clear();
        state.head_failures = 0;
        state.finish();
        info!("queue: stopped after {}/{}", state.sent_files, state.total_files);
        Some(state.snapshot())
    }

    /// Current state without consuming a finished run's report.
    pub async fn peek(&self) -> QueueSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Current state. Counts of a finished run are reported once, then reset.
    pub async fn status(&self) -> QueueSnapshot {
        let mut state = self.state.lock().await;
        let snapshot = state.snapshot();
        if !state.active && state.retained {
            let generation = state.generation;
            *state = QueueState {
                generation,
                ..Default::default()
            };
        }
        snapshot
    }
}

fn spawn_ticker(run: Arc<Run>, interval: Duration, cancel: CancellationToken) {
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticks.tick() => {}
            }
            if run.tick().await == Tick::Finished {
                break;
            }
        }
    });
}

impl Run {
    /// Try to deliver the head of `pending` once.
    async fn tick(&self) -> Tick {
        let (path, position, total) = {
            let state = self.state.lock().await;
            if state.generation != self.generation || !state.active {
                return Tick::Finished;
            }
            match state.pending.front() {
                Some(p) => (
                    p.clone(),
                    state.sent_files + state.skipped.len() + 1,
                    state.total_files,
                ),
                None => return Tick::Finished,
            }
        };

        let name = file_name(&path);
        let caption = format!("{name} ({position}/{total})");
        let result = self
            .channel
            .send_media(&self.target, &path, &caption)
            .await;

        let mut state = self.state.lock().await;
        if state.generation != self.generation {
            return Tick::Finished;
        }
        if !state.active {
            // Stopped mid-delivery: a file that went out still counts.
            if result.is_ok() {
                state.sent_files += 1;
                state.sent_list.push(name);
            }
            return Tick::Finished;
        }

        match result {
            Ok(()) => {
                state.pending.pop_front();
                state.head_failures = 0;
                state.sent_files += 1;
                state.sent_list.push(name.clone());
                info!("queue: sent {name} ({}/{})", state.sent_files, state.total_files);
                self.notifier.emit(Notification::QueueProgress {
                    sent_files: state.sent_files,
                    total_files: state.total_files,
                    last_file: name,
                });
            }
            Err(e) => {
                state.head_failures += 1;
                warn!(
                    "queue: {name} failed (attempt {}/{}): {e}",
                    state.head_failures, self.max_attempts
                );
                if state.head_failures >= self.max_attempts {
                    state.pending.pop_front();
                    state.head_failures = 0;
                    state.skipped.push(name.clone());
                    let report = format!(
                        "Skipped {name} after {} failed attempts: {e}",
                        self.max_attempts
                    );
                    self.notifier.emit(Notification::Error {
                        message: report.clone(),
                    });
                    drop(state);
                    self.send_text(&report).await;
                    state = self.state.lock().await;
                    if state.generation != self.generation || !state.active {
                        return Tick::Finished;
                    }
                }
            }
        }

        if !state.pending.is_empty() {
            return Tick::Continue;
        }

        state.finish();
        let total = state.total_files;
        let mut report = format!("Queue complete: {}/{total} files sent.", state.sent_files);
        if !state.skipped.is_empty() {
            report.push_str(&format!("\nSkipped: {}", state.skipped.join(", ")));
        }
        drop(state);

        info!("queue: complete");
        self.notifier
            .emit(Notification::QueueComplete { total_files: total });
        self.send_text(&report).await;
        Tick::Finished
    }

    async fn send_text(&self, text: &str) {
        if let Err(e) = self.channel.send_text(&self.target, text).await {
            warn!("queue: failed to report: {e}");
        }
    }
}

/// Regular files directly in `folder`, sorted by name.
fn list_files(folder: &Path) -> Result<Vec<PathBuf>, CourierError> {
    if !folder.exists() {
        return Err(CourierError::NotFound(format!("folder {}", folder.display())));
    }
    if !folder.is_dir() {
        return Err(CourierError::NotFound(format!(
            "{} is not a folder",
            folder.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    if files.is_empty() {
        return Err(CourierError::NotFound(format!(
            "no files in {}",
            folder.display()
        )));
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
