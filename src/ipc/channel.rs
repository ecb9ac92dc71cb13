use crate::error::{MinderError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;

/// Environment variable advertising the channel socket path to the child
pub const SOCKET_ENV_VAR: &str = "MINDER_IPC_SOCKET";

/// Message a module child sends once it has finished initializing
pub const READY_MESSAGE: &str = "ready";

/// Message the supervisor sends to request cooperative shutdown
pub const SHUTDOWN_MESSAGE: &str = "shutdown";

static CHANNEL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Bidirectional message channel between the supervisor and one module child.
///
/// One Unix socket per launch; messages are newline-delimited JSON strings.
/// Outbound messages are queued, so a shutdown request sent before the child
/// has connected is delivered as soon as it does.
#[derive(Debug)]
pub struct IpcChannel {
    socket_path: PathBuf,
    outgoing: mpsc::UnboundedSender<String>,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

impl IpcChannel {
    /// Bind a fresh per-launch socket and start the shuttle task.
    pub fn bind() -> Result<Self> {
        let socket_path = std::env::temp_dir().join(format!(
            "minder-{}-{}.sock",
            std::process::id(),
            CHANNEL_SEQ.fetch_add(1, Ordering::SeqCst)
        ));

        if socket_path.exists() {
            std::fs::remove_file(&socket_path).map_err(|e| {
                MinderError::Ipc(format!("Failed to remove stale socket: {}", e))
            })?;
        }

        let listener = UnixListener::bind(&socket_path)
            .map_err(|e| MinderError::Ipc(format!("Failed to bind socket: {}", e)))?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        tokio::spawn(shuttle(listener, outgoing_rx, incoming_tx));

        Ok(Self {
            socket_path,
            outgoing: outgoing_tx,
            incoming: Mutex::new(Some(incoming_rx)),
        })
    }

    /// Queue a message for the child.
    pub fn send(&self, message: &str) -> Result<()> {
        self.outgoing
            .send(message.to_string())
            .map_err(|_| MinderError::Ipc("channel task has shut down".to_string()))
    }

    /// Take the inbound message stream. Single consumer; returns `None` once
    /// taken.
    pub fn take_messages(&self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.incoming.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcChannel {
    fn drop(&mut self) {
        // Clean up the socket file; the shuttle task winds down on its own
        // once the outgoing sender is gone
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Accept the single expected peer, then shuttle messages both ways until
/// either side goes away.
async fn shuttle(
    listener: UnixListener,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    incoming: mpsc::UnboundedSender<String>,
) {
    let stream = match listener.accept().await {
        Ok((stream, _addr)) => stream,
        Err(e) => {
            tracing::debug!("IPC accept failed: {}", e);
            return;
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            queued = outgoing.recv() => match queued {
                Some(message) => {
                    let frame = match serde_json::to_string(&message) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Failed to serialize IPC message: {}", e);
                            continue;
                        }
                    };
                    if write_half.write_all(frame.as_bytes()).await.is_err()
                        || write_half.write_all(b"\n").await.is_err()
                    {
                        return;
                    }
                    let _ = write_half.flush().await;
                }
                None => return,
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => match serde_json::from_str::<String>(&line) {
                    // A closed receiver just means nobody is listening for
                    // messages; keep shuttling writes
                    Ok(message) => {
                        let _ = incoming.send(message);
                    }
                    Err(e) => tracing::debug!("Ignoring malformed IPC message: {}", e),
                },
                Ok(None) | Err(_) => return,
            },
        }
    }
}
