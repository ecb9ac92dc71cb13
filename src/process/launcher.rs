use crate::config::LaunchSpec;
use crate::error::Result;
use crate::ipc::{IpcChannel, SOCKET_ENV_VAR};
use crate::process::handle::{Completion, Outcome, ProcessHandle};
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// Launch the process described by the spec.
///
/// This never returns an error: a spawn failure settles the handle's
/// completion with a launch error instead, so the caller observes every
/// outcome through the same future. An exit event can never overwrite a
/// launch error because the completion is write-once.
pub async fn launch(
    spec: &LaunchSpec,
    silent: bool,
    env: Option<&HashMap<String, String>>,
) -> ProcessHandle {
    let (mut command, channel) = match build_command(spec, silent, env) {
        Ok(pair) => pair,
        Err(e) => {
            return ProcessHandle::new(
                None,
                Completion::settled(Outcome::LaunchFailed(e.to_string())),
                None,
            );
        }
    };

    match command.spawn() {
        Ok(child) => {
            let pid = child.id();
            tracing::info!(?pid, "launched child process");
            let completion = Completion::new();
            spawn_exit_watcher(child, completion.clone());
            ProcessHandle::new(pid, completion, channel)
        }
        Err(e) => {
            tracing::warn!("Failed to launch process: {}", e);
            ProcessHandle::new(
                None,
                Completion::settled(Outcome::LaunchFailed(e.to_string())),
                channel,
            )
        }
    }
}

/// Build the `tokio::process::Command` for a spec, binding the IPC channel
/// first for module launches so its socket path can be advertised to the
/// child.
fn build_command(
    spec: &LaunchSpec,
    silent: bool,
    env: Option<&HashMap<String, String>>,
) -> Result<(Command, Option<IpcChannel>)> {
    let (mut command, channel) = match spec {
        LaunchSpec::Command { program, args } => {
            let mut command = Command::new(program);
            command.args(args);
            (command, None)
        }
        LaunchSpec::Module {
            module_path,
            args,
            exec_path,
            exec_argv,
        } => {
            let channel = IpcChannel::bind()?;
            let mut command = Command::new(exec_path);
            command.args(exec_argv).arg(module_path).args(args);
            (command, Some(channel))
        }
    };

    // A replacement environment is wholesale: nothing is inherited
    if let Some(env) = env {
        command.env_clear().envs(env);
    }

    // Advertised after any env_clear so the replacement cannot hide it
    if let Some(ref channel) = channel {
        command.env(SOCKET_ENV_VAR, channel.socket_path());
    }

    if silent {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    Ok((command, channel))
}

/// Await the child's exit and settle the completion with its classification.
fn spawn_exit_watcher(mut child: Child, completion: Completion) {
    tokio::spawn(async move {
        let outcome = match child.wait().await {
            Ok(status) => classify_exit(status),
            Err(e) => Outcome::LaunchFailed(format!("wait failed: {}", e)),
        };
        tracing::debug!(?outcome, "child process settled");
        completion.settle(outcome);
    });
}

/// Exit code 0 is success; any other code or death by signal is failure.
///
/// A signaled child has no exit code on Unix, so the failure detail carries
/// the signal name and number instead ("SIGKILL:9").
fn classify_exit(status: ExitStatus) -> Outcome {
    if status.success() {
        return Outcome::Clean;
    }

    if let Some(signo) = status.signal() {
        let name = nix::sys::signal::Signal::try_from(signo)
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|_| format!("SIG{}", signo));
        return Outcome::Failed(format!("{}:{}", name, signo));
    }

    Outcome::Failed(status.code().unwrap_or(-1).to_string())
}
