mod commands;
mod gateway;
mod markers;

use clap::{Parser, Subcommand};
use courier_channels::console::ConsoleChannel;
use courier_core::{
    config::{self, BackendKind, Config},
    context::Context,
    traits::{Backend, Channel},
};
use courier_providers::{build_backend, BatchBackend};
use gateway::notifier::Notifier;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Courier: self-chat automation assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", env = "COURIER_CONFIG")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the assistant on the configured self-channel.
    Start,
    /// Check backend availability and channel configuration.
    Status,
    /// Send a one-shot prompt to the default backend.
    Ask {
        /// The prompt to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg);

    match cli.command {
        Commands::Start => start(cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await,
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: courier ask <message>");
            }
            ask(&cfg, &message.join(" ")).await?;
        }
    }

    Ok(())
}

/// Stderr plus a daily log file under the data directory. `RUST_LOG` wins
/// over the configured level.
fn init_tracing(cfg: &Config) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&cfg.courier.log_level))
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let log_dir = cfg.courier.data_path().join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        tracing_subscriber::registry().with(stderr_layer).init();
        warn!("file logging disabled, cannot create {}: {e}", log_dir.display());
        return None;
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "courier.log"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Some(guard)
}

fn build_backends(cfg: &Config) -> HashMap<BackendKind, Arc<dyn Backend>> {
    BackendKind::ALL
        .into_iter()
        .map(|kind| (kind, build_backend(kind, &cfg.backend)))
        .collect()
}

async fn start(cfg: Config) -> anyhow::Result<()> {
    let backends = build_backends(&cfg);
    let default = cfg.backend.default;
    match backends.get(&default) {
        Some(backend) if backend.is_available().await => {}
        _ => anyhow::bail!(
            "backend '{default}' is not available. Is `{}` installed and on PATH?",
            cfg.backend.cli(default).command
        ),
    }
    for (kind, backend) in &backends {
        if *kind != default && !backend.is_available().await {
            warn!("backend '{kind}' is not available; /{kind} will fail until it is installed");
        }
    }

    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    if let Some(ref console) = cfg.channel.console {
        if console.enabled {
            channels.insert(
                "console".to_string(),
                Arc::new(ConsoleChannel::new(console.clone())),
            );
        }
    }
    if channels.is_empty() {
        anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
    }

    let notifier = Notifier::new(64);
    tokio::spawn(log_notifications(notifier.subscribe()));

    info!("Courier starting | data dir: {}", cfg.courier.data_path().display());
    let gw = Arc::new(gateway::Gateway::new(&cfg, backends, channels, notifier));
    gw.run().await
}

/// Write each notification as one JSON line in the log.
async fn log_notifications(mut rx: broadcast::Receiver<courier_core::message::Notification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => match serde_json::to_value(&notification) {
                Ok(mut json) => {
                    json["timestamp"] = chrono::Utc::now().to_rfc3339().into();
                    info!(target: "courier::notify", "{json}");
                }
                Err(e) => warn!("failed to serialize notification: {e}"),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("notification log lagged, {n} events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn status(config_path: &str, cfg: &Config) {
    println!("Courier status check\n");
    println!("Config: {config_path}");
    println!("Data dir: {}", cfg.courier.data_path().display());
    println!("Default backend: {}", cfg.backend.default);
    println!();

    for kind in BackendKind::ALL {
        let command = &cfg.backend.cli(kind).command;
        let available = BatchBackend::check_cli(command).await;
        println!(
            "  {kind} ({command}): {}",
            if available { "available" } else { "not found" }
        );
    }
    println!();

    match cfg.channel.console {
        Some(ref console) if console.enabled => {
            println!("  console: enabled (target {})", console.target)
        }
        Some(_) => println!("  console: disabled"),
        None => println!("  console: not configured"),
    }
    println!(
        "  screenshot: {}",
        if cfg.screenshot.is_configured() {
            cfg.screenshot.command.as_str()
        } else {
            "not configured"
        }
    );
}

async fn ask(cfg: &Config, prompt: &str) -> anyhow::Result<()> {
    let kind = cfg.backend.default;
    let backend = build_backend(kind, &cfg.backend);
    if !backend.is_available().await {
        anyhow::bail!(
            "backend '{kind}' is not available. Is `{}` installed and authenticated?",
            cfg.backend.cli(kind).command
        );
    }

    let context = Context::new(prompt);
    let reply = backend.invoke(&context.to_prompt_string()).await?;
    let extracted = markers::extract(&reply.text);
    println!("{}", extracted.cleaned_text);
    if let Some(file) = extracted.file {
        println!("[file] {}", file.path.display());
    }
    Ok(())
}
