// IPC module - message channel between supervisor and module children

pub mod channel;

pub use channel::{IpcChannel, READY_MESSAGE, SHUTDOWN_MESSAGE, SOCKET_ENV_VAR};
