use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use dissembler::{Error, Lifecycle, LogFormat, Reloader, Supervisor, SupervisorConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

#[derive(Parser, Debug)]
#[command(name = "dissembler", version = dissembler::version::VERSION, about = "Run a heartbeat service under the dissembler supervisor")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "DISSEMBLER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: json, pretty or compact
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Seconds between heartbeats
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Return shutdown-path errors instead of only logging them
    #[arg(long)]
    strict: bool,

    /// Reload on SIGHUP
    #[arg(long)]
    reload_on_hup: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

/// Logs a heartbeat until stopped
struct Heartbeat {
    interval: Duration,
    beats: AtomicU64,
    shutdown: CancellationToken,
}

impl Heartbeat {
    fn new(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            beats: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Lifecycle for Heartbeat {
    async fn init(&self) -> dissembler::Result<()> {
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig {
                field: "interval_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        info!(pid = std::process::id(), "Heartbeat initialized");
        Ok(())
    }

    async fn start(&self) -> dissembler::Result<()> {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {
                    let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(beat, "heartbeat");
                }
            }
        }
        Ok(())
    }

    async fn stop(&self) -> dissembler::Result<()> {
        self.shutdown.cancel();
        info!(beats = self.beats.load(Ordering::Relaxed), "Heartbeat stopped");
        Ok(())
    }

    fn as_reloader(&self) -> Option<&dyn Reloader> {
        Some(self)
    }
}

#[async_trait]
impl Reloader for Heartbeat {
    async fn reload(&self) -> dissembler::Result<()> {
        self.beats.store(0, Ordering::Relaxed);
        info!("Heartbeat counter reset");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        SupervisorConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
    config.strict_shutdown |= cli.strict;
    config.reload_on_hup |= cli.reload_on_hup;

    if cli.print_config {
        config.validate()?;
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    dissembler::logging::init(&config.log)?;

    run(Arc::new(Heartbeat::new(cli.interval_secs)), config)
        .instrument(dissembler::logging::root_span())
        .await
}

async fn run(heartbeat: Arc<Heartbeat>, config: SupervisorConfig) -> anyhow::Result<()> {
    info!(pid = std::process::id(), "dissembler starting");

    let mut supervisor = Supervisor::with_config(heartbeat, config)?;
    supervisor.serve().await?;

    info!(signal = ?supervisor.caught(), "dissembler exiting");
    Ok(())
}
