use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ramtop::system::snapshot::ProcessIdentity;
use ramtop::system::terminate::{KillMode, SysinfoTerminator, TerminateError, Terminator};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

fn spawn_long_lived_child() -> Child {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = Command::new("powershell");
        c.args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "Start-Sleep -Seconds 30",
        ]);
        c
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = Command::new("sh");
        c.args(["-c", "sleep 30"]);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn child process")
}

/// Waits until sysinfo sees `pid` and returns its full identity.
fn wait_for_identity(pid: u32, timeout: Duration) -> Option<ProcessIdentity> {
    let mut sys = System::new();
    let sys_pid = Pid::from_u32(pid);
    let deadline = Instant::now() + timeout;
    loop {
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        if let Some(process) = sys.process(sys_pid) {
            return Some(ProcessIdentity::new(pid, process.start_time()));
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(50)),
            _ => return false,
        }
    }
}

#[test]
fn terminate_nonexistent_pid_is_not_found() {
    let mut terminator = SysinfoTerminator::new();
    let result = terminator.terminate(ProcessIdentity::new(u32::MAX, 0), KillMode::Graceful);
    assert_eq!(result, Err(TerminateError::NotFound));
}

#[test]
fn stale_start_time_is_never_signalled() {
    let mut child = spawn_long_lived_child();
    let Some(identity) = wait_for_identity(child.id(), Duration::from_secs(3)) else {
        let _ = child.kill();
        panic!("child process was not observed by sysinfo");
    };

    let stale = ProcessIdentity::new(identity.pid, identity.start_time.wrapping_add(1_000));
    let mut terminator = SysinfoTerminator::new();
    let result = terminator.terminate(stale, KillMode::Force);

    let still_running = matches!(child.try_wait(), Ok(None));
    let _ = child.kill();
    let _ = child.wait();

    assert_eq!(result, Err(TerminateError::NotFound));
    assert!(still_running, "a stale identity must not kill the live process");
}

#[test]
fn terminate_spawned_child() {
    let mut child = spawn_long_lived_child();
    let Some(identity) = wait_for_identity(child.id(), Duration::from_secs(3)) else {
        let _ = child.kill();
        panic!("child process was not observed by sysinfo");
    };

    let mode = if cfg!(windows) {
        KillMode::Force
    } else {
        KillMode::Graceful
    };
    let mut terminator = SysinfoTerminator::new();
    let result = terminator.terminate(identity, mode);

    if result.is_err() {
        let _ = child.kill();
        panic!("terminate reported failure: {result:?}");
    }
    if !wait_for_exit(&mut child, Duration::from_secs(5)) {
        let _ = child.kill();
        panic!("child process did not exit before timeout");
    }
}
