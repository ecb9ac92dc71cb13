use thiserror::Error;

/// Main error type for the minder process supervisor
#[derive(Debug, Error)]
pub enum MinderError {
    /// The process could not be started at all. Never retried by the core.
    #[error("Failed to launch process: {0}")]
    Launch(String),

    /// The process exited nonzero or was killed by a signal. The detail is
    /// either the exit code ("1") or the signal name followed by the signal
    /// number ("SIGKILL:9").
    #[error("Child exited with {0}")]
    Exit(String),

    #[error("Invalid launch spec: {0}")]
    InvalidSpec(String),

    #[error("IPC channel error: {0}")]
    Ipc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for minder operations
pub type Result<T> = std::result::Result<T, MinderError>;
