use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

use super::platform;

#[derive(Debug, Error)]
pub enum RelaunchError {
    #[error("elevated relaunch is not supported on this platform")]
    Unsupported,
    #[error("cannot locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("failed to run sudo: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relaunch {
    /// Already running as root; continue in this process.
    AlreadyElevated,
    /// The elevated copy ran to completion with this exit code.
    Exited(Option<i32>),
}

/// Re-executes the current binary under `sudo`, waiting for it to exit.
///
/// Only meant for startup, before the terminal is taken over, so sudo can
/// prompt on the inherited tty.
pub fn relaunch_elevated(args: Vec<OsString>) -> Result<Relaunch, RelaunchError> {
    if platform::is_elevated() {
        return Ok(Relaunch::AlreadyElevated);
    }
    if !platform::supports_sudo_relaunch() {
        return Err(RelaunchError::Unsupported);
    }

    let exe = std::env::current_exe().map_err(RelaunchError::CurrentExe)?;
    tracing::info!(exe = %exe.display(), "relaunching with sudo");
    let status = sudo_command(&exe, &args)
        .status()
        .map_err(RelaunchError::Spawn)?;
    Ok(Relaunch::Exited(status.code()))
}

fn sudo_command(exe: &Path, args: &[OsString]) -> Command {
    let mut cmd = Command::new("sudo");
    cmd.arg(exe).args(args);
    cmd
}
