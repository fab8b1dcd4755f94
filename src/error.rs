use std::time::Duration;
use thiserror::Error;

use crate::service::LifecycleState;

/// Errors produced by the supervisor and by supervised lifecycles
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // Signal subsystem errors
    #[error("Failed to register signal handlers: {0}")]
    SignalRegistration(#[source] std::io::Error),

    #[error("Signal channel closed before a terminating signal arrived")]
    SignalChannelClosed,

    // Lifecycle errors
    #[error("Start failed: {0}")]
    StartFailed(String),

    #[error("Stop failed: {0}")]
    Stop(#[source] Box<Error>),

    #[error("Stop timed out after {timeout:?}")]
    StopTimeout { timeout: Duration },

    #[error("Supervisor already served (state: {state})")]
    AlreadyServed { state: LifecycleState },

    #[error("Logging initialization failed: {0}")]
    Logging(String),

    // General service error
    #[error("Service error: {0}")]
    Service(String),

    // Errors raised by the supervised application
    #[error("Application error: {0}")]
    Application(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The point in a run where an error is raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Before any lifecycle phase ran (config, logging, signal registration)
    Setup,
    /// Raised by or around `init`
    Init,
    /// Raised while the application is running
    Runtime,
    /// Raised on the shutdown path
    Shutdown,
}

impl Error {
    /// Wrap an arbitrary application error
    pub fn application<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Application(err.into())
    }

    /// Mark an error returned by a lifecycle's `stop`
    pub fn stop(err: Self) -> Self {
        Self::Stop(Box::new(err))
    }

    /// Categorize the error by the phase that raised it.
    ///
    /// A bare application or service error reaching the caller from `serve`
    /// came out of `init`, which is returned unchanged. Errors from `stop` are
    /// wrapped in [`Error::Stop`] before they leave the supervisor.
    pub const fn phase(&self) -> ErrorPhase {
        match self {
            Self::Config(_)
            | Self::InvalidConfig { .. }
            | Self::SignalRegistration(_)
            | Self::AlreadyServed { .. }
            | Self::Logging(_) => ErrorPhase::Setup,

            Self::StartFailed(_) | Self::SignalChannelClosed => ErrorPhase::Runtime,

            Self::Stop(_) | Self::StopTimeout { .. } => ErrorPhase::Shutdown,

            Self::Service(_) | Self::Application(_) => ErrorPhase::Init,
        }
    }

    /// Check if the error aborts a run before the application is started
    pub fn is_fatal(&self) -> bool {
        matches!(self.phase(), ErrorPhase::Setup | ErrorPhase::Init)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
