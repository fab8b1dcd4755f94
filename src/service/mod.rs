pub mod lifecycle;
pub mod signals;
pub mod supervisor;

pub use lifecycle::{Lifecycle, Reloader};
pub use signals::{Disposition, Signal, SignalListener, SignalSender};
pub use supervisor::{serve, LifecycleState, Supervisor};
