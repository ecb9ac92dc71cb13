// Process module - single-child supervision core

pub mod handle;
pub mod launcher;
pub mod ready;
mod supervisor;

pub use handle::{Completion, Outcome, ProcessHandle};
pub use ready::{ReadinessGate, READY_TIMEOUT};
pub use supervisor::{monitor, monitor_module, Supervisor};
