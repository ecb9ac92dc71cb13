use crate::ipc::READY_MESSAGE;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// How long the supervisor waits for a module child to report readiness
pub const READY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Race between the child's "ready" message and a timer.
///
/// Readiness is best-effort: the timeout path is a liveness fallback, not an
/// error condition. Whichever side wins, the `select!` cancels the other, so
/// a late message or timer tick never fires redundant work.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessGate {
    timeout: Duration,
}

impl ReadinessGate {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Block until "ready" arrives or the timeout elapses, whichever comes
    /// first. Messages other than "ready" are ignored.
    pub async fn wait(&self, messages: &mut mpsc::UnboundedReceiver<String>) {
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::debug!("readiness wait timed out, handing supervisor back");
                    return;
                }
                message = messages.recv() => match message.as_deref() {
                    Some(READY_MESSAGE) => {
                        tracing::debug!("child reported ready");
                        return;
                    }
                    Some(_) => continue,
                    None => {
                        // Channel gone (child died or never connected); keep
                        // waiting on the timer so the supervisor is still
                        // handed back at the deadline
                        deadline.as_mut().await;
                        return;
                    }
                },
            }
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(READY_TIMEOUT)
    }
}
