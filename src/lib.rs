//! # dissembler
//!
//! A minimal process-lifecycle supervisor. An application implements
//! [`Lifecycle`] (`init`, `start`, `stop`); the [`Supervisor`] runs `init`,
//! spawns `start`, and then blocks until the process receives SIGINT, SIGQUIT
//! or SIGTERM, at which point it runs `stop` exactly once and returns.
//!
//! SIGHUP, SIGUSR1 and SIGUSR2 are caught and logged. SIGHUP can be routed to
//! an optional [`Reloader`] by setting [`SupervisorConfig::reload_on_hup`].
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use dissembler::{Lifecycle, Result};
//!
//! struct App;
//!
//! #[async_trait]
//! impl Lifecycle for App {
//!     async fn init(&self) -> Result<()> { Ok(()) }
//!     async fn start(&self) -> Result<()> { Ok(()) }
//!     async fn stop(&self) -> Result<()> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     dissembler::serve(App).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod version;

pub use config::{LogConfig, LogFormat, SupervisorConfig};
pub use error::{Error, ErrorPhase, Result};
pub use service::{
    serve, Disposition, Lifecycle, LifecycleState, Reloader, Signal, SignalListener,
    SignalSender, Supervisor,
};
pub use version::{human_version, VERSION};
