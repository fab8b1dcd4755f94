use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn, Instrument};

/// Smallest queue that survives a rapid double signal (e.g. INT then TERM)
pub const MIN_SIGNAL_BUFFER: usize = 2;

/// Signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Hup,
    Int,
    Quit,
    Term,
    Usr1,
    Usr2,
}

/// What the wait loop does with a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Run `stop` and leave the wait loop
    Shutdown,
    /// Reload configuration when enabled and supported, otherwise ignore
    Reload,
    /// Recognized, logged, and not acted upon
    Unhandled,
}

impl Signal {
    /// Every signal the supervisor subscribes to
    pub const ALL: [Self; 6] = [
        Self::Hup,
        Self::Int,
        Self::Quit,
        Self::Term,
        Self::Usr1,
        Self::Usr2,
    ];

    /// Raw OS signal number
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2};

        match self {
            Self::Hup => SIGHUP,
            Self::Int => SIGINT,
            Self::Quit => SIGQUIT,
            Self::Term => SIGTERM,
            Self::Usr1 => SIGUSR1,
            Self::Usr2 => SIGUSR2,
        }
    }

    /// Map a raw OS signal number back to a supervised signal
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|signal| signal.as_raw() == raw)
    }

    #[must_use]
    pub const fn disposition(self) -> Disposition {
        match self {
            Self::Int | Self::Quit | Self::Term => Disposition::Shutdown,
            Self::Hup => Disposition::Reload,
            Self::Usr1 | Self::Usr2 => Disposition::Unhandled,
        }
    }

    /// INT, QUIT and TERM end the run
    #[must_use]
    pub const fn is_terminating(self) -> bool {
        matches!(self.disposition(), Disposition::Shutdown)
    }

    /// Send this signal to a process
    pub fn send_to(self, pid: u32) -> crate::Result<()> {
        use nix::sys::signal;
        use nix::unistd::Pid;

        let nix_signal = match self {
            Self::Term => signal::Signal::SIGTERM,
            Self::Int => signal::Signal::SIGINT,
            Self::Quit => signal::Signal::SIGQUIT,
            Self::Hup => signal::Signal::SIGHUP,
            Self::Usr1 => signal::Signal::SIGUSR1,
            Self::Usr2 => signal::Signal::SIGUSR2,
        };

        let pid = i32::try_from(pid)
            .map_err(|e| crate::Error::Service(format!("Invalid PID {pid}: {e}")))?;

        signal::kill(Pid::from_raw(pid), nix_signal)
            .map_err(|e| crate::Error::Service(format!("Failed to send {self}: {e}")))
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Term => write!(f, "SIGTERM"),
            Self::Int => write!(f, "SIGINT"),
            Self::Quit => write!(f, "SIGQUIT"),
            Self::Hup => write!(f, "SIGHUP"),
            Self::Usr1 => write!(f, "SIGUSR1"),
            Self::Usr2 => write!(f, "SIGUSR2"),
        }
    }
}

/// Bounded queue of signals consumed by the supervisor's wait loop.
///
/// The queue applies back-pressure instead of dropping: a producer waits for
/// room, so a burst no larger than the buffer never loses a notification.
pub struct SignalListener {
    rx: mpsc::Receiver<Signal>,
    handle: Option<signal_hook_tokio::Handle>,
    forwarder: Option<JoinHandle<()>>,
}

/// Producer side of an in-process signal queue
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<Signal>,
}

impl SignalListener {
    /// Subscribe to OS delivery of every signal in [`Signal::ALL`].
    ///
    /// Once registered, the default action of these signals (terminating the
    /// process for most of them) no longer runs. Must be called from within a
    /// tokio runtime.
    #[instrument]
    pub fn register(buffer: usize) -> crate::Result<Self> {
        use futures::stream::StreamExt;
        use signal_hook_tokio::Signals;

        debug!("Registering signal handlers");

        let raw: Vec<i32> = Signal::ALL.iter().map(|s| s.as_raw()).collect();
        let mut signals = Signals::new(raw).map_err(crate::Error::SignalRegistration)?;
        let handle = signals.handle();

        let (tx, rx) = mpsc::channel(buffer.max(MIN_SIGNAL_BUFFER));
        let forwarder = tokio::spawn(async move {
            while let Some(raw) = signals.next().await {
                let Some(signal) = Signal::from_raw(raw) else {
                    warn!("Received unexpected signal: {}", raw);
                    continue;
                };
                if tx.send(signal).await.is_err() {
                    break;
                }
            }
            debug!("Signal forwarder exiting");
        }
        .in_current_span());

        Ok(Self {
            rx,
            handle: Some(handle),
            forwarder: Some(forwarder),
        })
    }

    /// Create an in-process queue, fed by the returned sender
    #[must_use]
    pub fn channel(buffer: usize) -> (SignalSender, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(MIN_SIGNAL_BUFFER));
        (
            SignalSender { tx },
            Self {
                rx,
                handle: None,
                forwarder: None,
            },
        )
    }

    /// Wait for the next signal; `None` once every producer is gone
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    /// Stop accepting new signals. Already queued ones can still be received.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        self.rx.close();
    }

    /// Check if this listener is fed by OS signal delivery
    #[must_use]
    pub const fn is_os_backed(&self) -> bool {
        self.handle.is_some() || self.forwarder.is_some()
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

impl std::fmt::Debug for SignalListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalListener")
            .field("os_backed", &self.is_os_backed())
            .finish()
    }
}

impl SignalSender {
    /// Queue a signal, waiting for room if the buffer is full
    pub async fn send(&self, signal: Signal) -> crate::Result<()> {
        self.tx
            .send(signal)
            .await
            .map_err(|_| crate::Error::SignalChannelClosed)
    }

    /// Queue a signal without waiting
    pub fn try_send(&self, signal: Signal) -> crate::Result<()> {
        self.tx.try_send(signal).map_err(|e| match e {
            mpsc::error::TrySendError::Full(s) => {
                crate::Error::Service(format!("Signal queue full, {s} not queued"))
            }
            mpsc::error::TrySendError::Closed(_) => crate::Error::SignalChannelClosed,
        })
    }
}
