use crate::error::{MinderError, Result};
use crate::ipc::IpcChannel;
use std::sync::Arc;
use tokio::sync::watch;

/// Final outcome of one supervised run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exited with code 0
    Clean,

    /// Nonzero exit or killed by a signal; the detail is the exit code
    /// ("1") or the signal name and number ("SIGKILL:9")
    Failed(String),

    /// The OS could not start the process
    LaunchFailed(String),
}

impl Outcome {
    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Clean => Ok(()),
            Outcome::Failed(detail) => Err(MinderError::Exit(detail)),
            Outcome::LaunchFailed(message) => Err(MinderError::Launch(message)),
        }
    }
}

/// Write-once completion slot shared between the exit watcher and any number
/// of waiters.
///
/// Settlement is first-writer-wins: once an outcome is recorded, later
/// settle attempts are dropped. This is what keeps a pending exit event from
/// overwriting an already-reported launch error.
#[derive(Debug, Clone)]
pub struct Completion {
    tx: Arc<watch::Sender<Option<Outcome>>>,
}

impl Completion {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a completion already settled with the given outcome.
    pub(crate) fn settled(outcome: Outcome) -> Self {
        let completion = Self::new();
        completion.settle(outcome);
        completion
    }

    /// Record the outcome. Returns `false` if the slot was already settled.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(outcome);
                true
            } else {
                false
            }
        })
    }

    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.tx.borrow().clone()
    }

    /// Wait for settlement. May be awaited by any number of callers, any
    /// number of times; always reports the first recorded outcome.
    pub async fn wait(&self) -> Result<()> {
        let mut rx = self.tx.subscribe();
        // Err only if the sender side is gone, which cannot happen while we
        // hold it ourselves
        let _ = rx.wait_for(|slot| slot.is_some()).await;
        match self.outcome() {
            Some(outcome) => outcome.into_result(),
            None => Err(MinderError::Launch("completion never settled".to_string())),
        }
    }
}

/// Pairs one launched OS process with its one-shot completion.
///
/// Becomes inert once the completion settles; no further transitions are
/// observable.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    completion: Completion,
    channel: Option<IpcChannel>,
}

impl ProcessHandle {
    pub(crate) fn new(pid: Option<u32>, completion: Completion, channel: Option<IpcChannel>) -> Self {
        Self {
            pid,
            completion,
            channel,
        }
    }

    /// OS process id, `None` if the launch itself failed
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Message channel to the child, present only for module launches
    pub fn channel(&self) -> Option<&IpcChannel> {
        self.channel.as_ref()
    }

    pub async fn wait(&self) -> Result<()> {
        self.completion.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_settlement_wins() {
        let completion = Completion::new();

        assert!(completion.settle(Outcome::LaunchFailed("no such file".to_string())));
        assert!(!completion.settle(Outcome::Clean));

        assert_eq!(
            completion.outcome(),
            Some(Outcome::LaunchFailed("no such file".to_string()))
        );
        assert!(matches!(
            completion.wait().await,
            Err(MinderError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn wait_resolves_after_late_settlement() {
        let completion = Completion::new();
        assert!(!completion.is_settled());

        let waiter = completion.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        completion.settle(Outcome::Clean);

        assert!(task.await.unwrap().is_ok());
        assert!(completion.is_settled());
    }

    #[tokio::test]
    async fn multiple_waiters_observe_same_outcome() {
        let completion = Completion::settled(Outcome::Failed("1".to_string()));

        for _ in 0..3 {
            let err = completion.wait().await.unwrap_err();
            assert_eq!(err.to_string(), "Child exited with 1");
        }
    }

    #[tokio::test]
    async fn handle_without_pid_reports_launch_error() {
        let handle = ProcessHandle::new(
            None,
            Completion::settled(Outcome::LaunchFailed("spawn failed".to_string())),
            None,
        );

        assert_eq!(handle.pid(), None);
        assert!(handle.channel().is_none());
        assert!(matches!(handle.wait().await, Err(MinderError::Launch(_))));
    }
}
