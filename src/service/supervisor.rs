use crate::config::SupervisorConfig;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::lifecycle::Lifecycle;
use super::signals::{Disposition, Signal, SignalListener};

/// Where a supervisor is in its single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Running,
    Stopping,
    Stopped,
    /// `init` returned an error
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives one [`Lifecycle`] from startup to signal-triggered shutdown.
///
/// A supervisor serves exactly once. `init` is awaited, `start` is spawned
/// and left running, and the wait loop calls `stop` on the first INT, QUIT or
/// TERM. Signals arriving after that are discarded.
pub struct Supervisor {
    lifecycle: Arc<dyn Lifecycle>,
    config: SupervisorConfig,
    state: LifecycleState,
    start_task: Option<JoinHandle<Result<()>>>,
    caught: Option<Signal>,
    stop_error: Option<Error>,
}

impl Supervisor {
    /// Create a supervisor with the default configuration
    pub fn new<L: Lifecycle>(lifecycle: Arc<L>) -> Self {
        Self {
            lifecycle,
            config: SupervisorConfig::default(),
            state: LifecycleState::Created,
            start_task: None,
            caught: None,
            stop_error: None,
        }
    }

    /// Create a supervisor with a validated configuration
    pub fn with_config<L: Lifecycle>(
        lifecycle: Arc<L>,
        config: SupervisorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(lifecycle)
        })
    }

    /// Serve the lifecycle, driven by OS signal delivery.
    ///
    /// Signal handlers are registered before `init` so a signal arriving during
    /// startup is queued rather than killing the process.
    pub async fn serve(&mut self) -> Result<()> {
        let listener = SignalListener::register(self.config.signal_buffer)?;
        self.serve_with(listener).await
    }

    /// Serve the lifecycle, driven by the given signal source.
    ///
    /// Only an `init` failure (or misuse) is returned in the default mode.
    /// Errors from waiting or from `stop` are logged and `Ok(())` is returned,
    /// unless `strict_shutdown` is set.
    #[instrument(name = "supervisor", skip_all, fields(dissembler_version = %crate::version::VERSION))]
    pub async fn serve_with(&mut self, mut listener: SignalListener) -> Result<()> {
        if self.state != LifecycleState::Created {
            return Err(Error::AlreadyServed { state: self.state });
        }

        debug!("Initializing lifecycle");
        if let Err(e) = self.lifecycle.init().await {
            self.state = LifecycleState::Failed;
            return Err(e);
        }
        self.state = LifecycleState::Initialized;

        self.spawn_start();

        let waited = self.wait(&mut listener).await;
        listener.close();

        match waited {
            Ok(signal) => info!(signal = %signal, "Shutdown complete"),
            Err(e) => {
                error!(error = %e, "Unable to finish waiting for shutdown");
                if self.config.strict_shutdown {
                    return Err(e);
                }
            }
        }

        if self.config.strict_shutdown {
            if let Some(e) = self.stop_error.take() {
                return Err(e);
            }
        }

        Ok(())
    }

    /// Block until a terminating signal arrives, then stop the lifecycle.
    ///
    /// Returns the signal that caused the shutdown. HUP reloads when enabled
    /// and supported; USR1 and USR2 are logged and ignored.
    pub async fn wait(&mut self, listener: &mut SignalListener) -> Result<Signal> {
        if matches!(
            self.state,
            LifecycleState::Stopping | LifecycleState::Stopped
        ) {
            return Err(Error::AlreadyServed { state: self.state });
        }

        loop {
            tokio::select! {
                received = listener.recv() => {
                    let Some(signal) = received else {
                        return Err(Error::SignalChannelClosed);
                    };
                    info!(signal = %signal, "signal caught");

                    match signal.disposition() {
                        Disposition::Shutdown => {
                            self.caught = Some(signal);
                            self.stop_once().await;
                            return Ok(signal);
                        }
                        Disposition::Reload => self.reload(signal).await,
                        Disposition::Unhandled => {
                            debug!(signal = %signal, "No handler for signal, continuing");
                        }
                    }
                }
                joined = start_exit(&mut self.start_task), if self.start_task.is_some() => {
                    self.start_task = None;
                    self.start_finished(joined).await?;
                }
            }
        }
    }

    /// Launch `start` on its own task
    fn spawn_start(&mut self) {
        let lifecycle = Arc::clone(&self.lifecycle);
        self.start_task = Some(tokio::spawn(
            async move { lifecycle.start().await }.in_current_span(),
        ));
        self.state = LifecycleState::Running;
        debug!("Start task launched");
    }

    /// React to the start task finishing before shutdown
    async fn start_finished(
        &mut self,
        joined: std::result::Result<Result<()>, JoinError>,
    ) -> Result<()> {
        let failure = match joined {
            Ok(Ok(())) => {
                debug!("Start returned; still waiting for a terminating signal");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) if e.is_panic() => format!("start task panicked: {e}"),
            Err(e) => format!("start task aborted: {e}"),
        };

        error!(error = %failure, "Start failed");

        if self.config.stop_on_start_failure {
            self.stop_once().await;
            return Err(Error::StartFailed(failure));
        }

        Ok(())
    }

    /// Run `stop`, at most once per supervisor
    async fn stop_once(&mut self) {
        if matches!(
            self.state,
            LifecycleState::Stopping | LifecycleState::Stopped
        ) {
            return;
        }
        self.state = LifecycleState::Stopping;
        info!("Stopping lifecycle");

        let stopped = match self.config.stop_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, self.lifecycle.stop()).await {
                Ok(stopped) => stopped.map_err(Error::stop),
                Err(_) => Err(Error::StopTimeout { timeout }),
            },
            None => self.lifecycle.stop().await.map_err(Error::stop),
        };
        self.state = LifecycleState::Stopped;

        if let Err(e) = stopped {
            error!(error = %e, "Lifecycle did not stop cleanly");
            self.stop_error = Some(e);
        }
    }

    async fn reload(&self, signal: Signal) {
        if !self.config.reload_on_hup {
            debug!(signal = %signal, "Reload on HUP disabled, continuing");
            return;
        }

        match self.lifecycle.as_reloader() {
            Some(reloader) => match reloader.reload().await {
                Ok(()) => info!("Configuration reloaded"),
                Err(e) => warn!(error = %e, "Configuration reload failed"),
            },
            None => warn!("Lifecycle does not support reloading configuration"),
        }
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// The signal that triggered shutdown, once one has
    #[must_use]
    pub const fn caught(&self) -> Option<Signal> {
        self.caught
    }

    #[must_use]
    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Take the handle of a still-running start task, e.g. to join it after
    /// `serve` returns
    pub fn take_start_handle(&mut self) -> Option<JoinHandle<Result<()>>> {
        self.start_task.take()
    }
}

async fn start_exit(
    task: &mut Option<JoinHandle<Result<()>>>,
) -> std::result::Result<Result<()>, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Serve a lifecycle with the default configuration until a terminating
/// signal arrives
pub async fn serve<L: Lifecycle>(lifecycle: L) -> Result<()> {
    Supervisor::new(Arc::new(lifecycle)).serve().await
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("start_running", &self.start_task.is_some())
            .field("caught", &self.caught)
            .finish()
    }
}
