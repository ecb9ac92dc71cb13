// Library exports for the minder process supervisor

pub mod cli;
pub mod config;
pub mod error;
pub mod ipc;
pub mod process;

pub use config::{ExecArgv, LaunchSpec, ModuleOptions, MonitorOptions};
pub use error::{MinderError, Result};
pub use process::{monitor, monitor_module, Supervisor};
