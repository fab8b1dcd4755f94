use async_trait::async_trait;

/// The lifecycle of a supervised API, service, or application.
///
/// # Lifecycle
///
/// 1. `init` is awaited before anything else runs. An error here ends the run.
/// 2. `start` is spawned on its own task and never awaited by the supervisor.
/// 3. `stop` is awaited exactly once after a terminating signal.
///
/// `stop` may run while `start` is still working, so teardown must not assume
/// that `start` has finished or even begun.
#[async_trait]
pub trait Lifecycle: Send + Sync + 'static {
    /// Set up client libraries and validate configuration prior to any
    /// operations.
    async fn init(&self) -> crate::Result<()>;

    /// Begin serving: accept connections, run a processing loop, provision
    /// resources.
    async fn start(&self) -> crate::Result<()>;

    /// Tear down and release resources prior to exiting.
    async fn stop(&self) -> crate::Result<()>;

    /// Reload capability, if this lifecycle has one
    fn as_reloader(&self) -> Option<&dyn Reloader> {
        None
    }
}

/// Optional capability for reloading configuration on SIGHUP.
///
/// A lifecycle opts in by overriding [`Lifecycle::as_reloader`] to return
/// `Some(self)`.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> crate::Result<()>;
}
