use minder::error::MinderError;
use minder::process::monitor;
use minder::MonitorOptions;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn quiet() -> MonitorOptions {
    MonitorOptions {
        silent: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn echo_resolves_clean() {
    let supervisor = monitor("echo hi", quiet()).await.unwrap();
    assert!(supervisor.wait().await.is_ok());
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn running_is_true_before_the_child_exits() {
    let supervisor = monitor("sleep 30", quiet()).await.unwrap();
    assert!(supervisor.is_running());
    assert!(!supervisor.is_stopped());

    let _ = supervisor.stop().await;
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn nonzero_exit_rejects_with_the_code() {
    let supervisor = monitor("false", quiet()).await.unwrap();
    let err = supervisor.wait().await.unwrap_err();
    assert_eq!(err.to_string(), "Child exited with 1");
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn signal_death_rejects_with_the_signal_name() {
    let supervisor = monitor("sleep 30", quiet()).await.unwrap();
    let pid = supervisor.pid().unwrap();

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pid as i32),
        nix::sys::signal::Signal::SIGTERM,
    )
    .unwrap();

    let err = supervisor.wait().await.unwrap_err();
    assert_eq!(err.to_string(), "Child exited with SIGTERM:15");
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn missing_executable_reports_a_launch_error() {
    let supervisor = monitor("/nonexistent/program --flag", quiet())
        .await
        .unwrap();

    assert!(supervisor.pid().is_none());
    assert!(matches!(
        supervisor.wait().await,
        Err(MinderError::Launch(_))
    ));
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn stop_never_errors_even_when_called_twice() {
    let supervisor = monitor("sleep 30", quiet()).await.unwrap();

    // SIGINT kills sleep, so both calls settle on the same failed completion;
    // the second must not attempt another signal
    let first = supervisor.stop().await;
    let second = supervisor.stop().await;

    assert!(first.is_err());
    assert!(second.is_err());
    assert!(supervisor.is_stopped());
}

#[tokio::test]
async fn stop_marks_stopped_while_a_stubborn_child_lingers() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("ignore-int.sh");
    std::fs::write(&script, "#!/bin/sh\ntrap '' INT\nsleep 1\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let supervisor = monitor(script.to_str().unwrap(), quiet()).await.unwrap();

    // Give the shell time to install its trap before the signal goes out
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stop = supervisor.stop();
    tokio::pin!(stop);

    // The child traps SIGINT, so stop() stays pending past the request
    let pending = tokio::time::timeout(Duration::from_millis(200), &mut stop).await;
    assert!(pending.is_err());
    assert!(supervisor.is_stopped());

    // The script exits 0 on its own after a second
    assert!(stop.await.is_ok());
}

#[tokio::test]
async fn restart_yields_a_fresh_running_supervisor() {
    let supervisor = monitor("sleep 30", quiet()).await.unwrap();
    let old_pid = supervisor.pid();

    let restarted = supervisor.restart().await;
    assert!(restarted.is_running());
    assert!(restarted.pid().is_some());
    assert_ne!(restarted.pid(), old_pid);

    let _ = restarted.stop().await;
}

#[tokio::test]
async fn restart_proceeds_after_a_failed_run() {
    let supervisor = monitor("false", quiet()).await.unwrap();
    let _ = supervisor.wait().await;
    assert!(supervisor.is_stopped());

    let restarted = supervisor.restart().await;
    assert!(restarted.pid().is_some());

    // The relaunched command fails again; still a normal settled run
    let err = restarted.wait().await.unwrap_err();
    assert_eq!(err.to_string(), "Child exited with 1");
}

#[tokio::test]
async fn stop_on_an_interruptible_child_completes_quickly() {
    let supervisor = monitor("sleep 30", quiet()).await.unwrap();

    let start = Instant::now();
    let result = supervisor.stop().await;
    assert!(start.elapsed() < Duration::from_secs(2));

    // sleep dies from SIGINT, which is a signaled exit
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Child exited with SIGINT:2");
}
