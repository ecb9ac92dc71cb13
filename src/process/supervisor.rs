use crate::config::{LaunchSpec, ModuleOptions, MonitorOptions};
use crate::error::Result;
use crate::ipc::SHUTDOWN_MESSAGE;
use crate::process::handle::{Completion, ProcessHandle};
use crate::process::launcher;
use crate::process::ready::ReadinessGate;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Grace period `restart()` gives the previous child before force-killing it
const RESTART_GRACE: Duration = Duration::from_secs(5);

/// Supervise an external command.
///
/// Resolves once the child has been launched, not once it exits. A launch
/// failure is delivered through the supervisor's completion, so `Err` here
/// only means the command line itself was unusable.
pub async fn monitor(cmd: &str, options: MonitorOptions) -> Result<Supervisor> {
    let spec = LaunchSpec::command(cmd)?;
    Ok(Supervisor::launch(spec, options.silent, options.env, false).await)
}

/// Supervise a module run under a controlled interpreter invocation, with an
/// IPC channel for the readiness/shutdown handshake.
///
/// With `wait_for_ready` set, this does not resolve until the child reports
/// `"ready"` or the readiness timeout elapses, whichever comes first.
pub async fn monitor_module(
    module_path: impl Into<PathBuf>,
    args: Vec<String>,
    options: ModuleOptions,
) -> Result<Supervisor> {
    let spec = LaunchSpec::module(
        module_path.into(),
        args,
        options.exec_path,
        options.exec_argv,
    )?;
    Ok(Supervisor::launch(spec, options.silent, options.env, options.wait_for_ready).await)
}

/// Caller-facing handle over one supervised child process.
///
/// Wraps exactly one [`ProcessHandle`] at a time. `restart()` consumes the
/// supervisor and returns a brand-new one: each supervised run is its own
/// value, and callers must chain onto the returned supervisor to keep
/// controlling the current child.
pub struct Supervisor {
    spec: LaunchSpec,
    silent: bool,
    env: Option<HashMap<String, String>>,
    wait_for_ready: bool,
    handle: ProcessHandle,
    stop_requested: AtomicBool,
}

impl Supervisor {
    async fn launch(
        spec: LaunchSpec,
        silent: bool,
        env: Option<HashMap<String, String>>,
        wait_for_ready: bool,
    ) -> Supervisor {
        let handle = launcher::launch(&spec, silent, env.as_ref()).await;

        // Readiness only applies to a child that actually launched
        if wait_for_ready && !handle.completion().is_settled() {
            if let Some(mut messages) = handle.channel().and_then(|c| c.take_messages()) {
                ReadinessGate::default().wait(&mut messages).await;
            }
        }

        Supervisor {
            spec,
            silent,
            env,
            wait_for_ready,
            handle,
            stop_requested: AtomicBool::new(false),
        }
    }

    /// OS process id of the current child, `None` if the launch failed
    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// The completion future for the current run
    pub fn completion(&self) -> Completion {
        self.handle.completion()
    }

    /// Stopped means a stop has been requested or the run has settled,
    /// whatever the outcome kind.
    pub fn is_stopped(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst) || self.handle.completion().is_settled()
    }

    pub fn is_running(&self) -> bool {
        !self.is_stopped()
    }

    /// Await the current run's settlement. May be called any number of times.
    pub async fn wait(&self) -> Result<()> {
        self.handle.wait().await
    }

    /// Request termination and await the child's actual exit.
    ///
    /// Idempotent: the first call marks the supervisor stopped and delivers
    /// one termination request (SIGINT for commands, the `"shutdown"` message
    /// for modules); later calls just await the same completion. Delivery
    /// failures are swallowed — the intent is already satisfied or moot.
    pub async fn stop(&self) -> Result<()> {
        let first_request = !self.stop_requested.swap(true, Ordering::SeqCst)
            && !self.handle.completion().is_settled();

        if first_request {
            self.request_termination();
        }

        self.wait().await
    }

    fn request_termination(&self) {
        match &self.spec {
            LaunchSpec::Command { .. } => {
                if let Some(pid) = self.handle.pid() {
                    tracing::info!(pid, "sending SIGINT to child");
                    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
                        tracing::debug!("Failed to deliver SIGINT: {}", e);
                    }
                }
            }
            LaunchSpec::Module { .. } => {
                if let Some(channel) = self.handle.channel() {
                    tracing::info!("sending shutdown message to module child");
                    if let Err(e) = channel.send(SHUTDOWN_MESSAGE) {
                        tracing::debug!("Failed to deliver shutdown message: {}", e);
                    }
                }
            }
        }
    }

    /// Stop the current child and launch a fresh one from the identical spec.
    ///
    /// Relaunches whether the previous run stopped cleanly or with an error.
    /// The previous child gets [`RESTART_GRACE`] to honor the stop request;
    /// past that it is force-killed with SIGKILL, so a restart chain never
    /// carries two live children.
    pub async fn restart(self) -> Supervisor {
        if tokio::time::timeout(RESTART_GRACE, self.stop()).await.is_err() {
            tracing::warn!("child ignored stop request, force killing before relaunch");
            if let Some(pid) = self.handle.pid() {
                let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
            let _ = self.wait().await;
        }

        Self::launch(self.spec, self.silent, self.env, self.wait_for_ready).await
    }
}
