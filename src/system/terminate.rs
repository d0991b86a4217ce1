use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};
use thiserror::Error;

use super::snapshot::ProcessIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillMode {
    /// SIGTERM where signals exist.
    Graceful,
    /// SIGKILL where signals exist.
    Force,
}

impl KillMode {
    fn signal(self) -> Signal {
        match self {
            KillMode::Graceful => Signal::Term,
            KillMode::Force => Signal::Kill,
        }
    }

    pub fn signal_name(self) -> &'static str {
        match self {
            KillMode::Graceful => "SIGTERM",
            KillMode::Force => "SIGKILL",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TerminateError {
    #[error("permission denied")]
    PermissionDenied,
    /// The target already exited, or its pid now belongs to another process.
    #[error("process not found")]
    NotFound,
}

pub trait Terminator {
    fn terminate(&mut self, identity: ProcessIdentity, mode: KillMode)
    -> Result<(), TerminateError>;
}

/// Signals processes through sysinfo, refusing to touch a pid whose start
/// time no longer matches the identity that was selected.
pub struct SysinfoTerminator {
    sys: System,
}

impl Default for SysinfoTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoTerminator {
    pub fn new() -> Self {
        SysinfoTerminator { sys: System::new() }
    }

    fn refresh(&mut self, pid: Pid) {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
    }

    fn is_alive(&mut self, identity: ProcessIdentity) -> bool {
        let pid = Pid::from_u32(identity.pid);
        self.refresh(pid);
        self.sys
            .process(pid)
            .is_some_and(|p| p.start_time() == identity.start_time)
    }
}

impl Terminator for SysinfoTerminator {
    fn terminate(
        &mut self,
        identity: ProcessIdentity,
        mode: KillMode,
    ) -> Result<(), TerminateError> {
        let pid = Pid::from_u32(identity.pid);
        self.refresh(pid);

        let delivered = match self.sys.process(pid) {
            Some(process) if process.start_time() == identity.start_time => {
                match process.kill_with(mode.signal()) {
                    Some(sent) => sent,
                    // Signal not supported on this platform, fall back to kill()
                    None => process.kill(),
                }
            }
            _ => return Err(TerminateError::NotFound),
        };

        if delivered {
            Ok(())
        } else if self.is_alive(identity) {
            Err(TerminateError::PermissionDenied)
        } else {
            Err(TerminateError::NotFound)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
    Terminated,
    /// Already gone before the signal; the requested outcome holds.
    AlreadyExited,
    PermissionDenied,
}

impl TerminationStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, TerminationStatus::PermissionDenied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationTarget {
    pub identity: ProcessIdentity,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationEntry {
    pub target: TerminationTarget,
    pub status: TerminationStatus,
}

/// Per-process outcome of a batch; never all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub entries: Vec<TerminationEntry>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_success()).count()
    }

    pub fn terminated(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == TerminationStatus::Terminated)
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TerminationEntry> {
        self.entries.iter().filter(|e| !e.status.is_success())
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let terminated = self.terminated();
        if terminated > 0 {
            parts.push(format!("Terminated {terminated} process(es)"));
        }
        let denied: Vec<String> = self
            .failed()
            .map(|e| format!("{} (PID: {})", e.target.name, e.target.identity.pid))
            .collect();
        if !denied.is_empty() {
            parts.push(format!(
                "Access denied for: {} - try --elevate",
                denied.join(", ")
            ));
        }
        if parts.is_empty() {
            "Selected processes had already exited".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// Signals every target in order; one failure never stops the rest.
pub fn terminate_batch<T: Terminator + ?Sized>(
    terminator: &mut T,
    targets: Vec<TerminationTarget>,
    mode: KillMode,
) -> BatchReport {
    let entries = targets
        .into_iter()
        .map(|target| {
            let status = match terminator.terminate(target.identity, mode) {
                Ok(()) => TerminationStatus::Terminated,
                Err(TerminateError::NotFound) => TerminationStatus::AlreadyExited,
                Err(TerminateError::PermissionDenied) => TerminationStatus::PermissionDenied,
            };
            tracing::info!(
                pid = target.identity.pid,
                name = %target.name,
                signal = mode.signal_name(),
                ?status,
                "termination attempted"
            );
            TerminationEntry { target, status }
        })
        .collect();
    BatchReport { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct ScriptedTerminator {
        outcomes: HashMap<u32, Result<(), TerminateError>>,
        calls: Vec<u32>,
    }

    impl Terminator for ScriptedTerminator {
        fn terminate(
            &mut self,
            identity: ProcessIdentity,
            _mode: KillMode,
        ) -> Result<(), TerminateError> {
            self.calls.push(identity.pid);
            self.outcomes.get(&identity.pid).cloned().unwrap_or(Ok(()))
        }
    }

    fn target(pid: u32) -> TerminationTarget {
        TerminationTarget {
            identity: ProcessIdentity::new(pid, pid as u64 * 10),
            name: format!("proc{pid}"),
        }
    }

    #[test]
    fn batch_continues_past_permission_denied() {
        let mut terminator = ScriptedTerminator {
            outcomes: HashMap::from([(2, Err(TerminateError::PermissionDenied))]),
            calls: Vec::new(),
        };
        let report = terminate_batch(
            &mut terminator,
            vec![target(1), target(2), target(3)],
            KillMode::Graceful,
        );

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(terminator.calls, vec![1, 2, 3]);
        assert_eq!(
            report.failed().next().map(|e| e.target.identity.pid),
            Some(2)
        );
    }

    #[test]
    fn not_found_counts_as_success() {
        let mut terminator = ScriptedTerminator {
            outcomes: HashMap::from([(1, Err(TerminateError::NotFound))]),
            calls: Vec::new(),
        };
        let report = terminate_batch(&mut terminator, vec![target(1)], KillMode::Force);
        assert_eq!(report.entries[0].status, TerminationStatus::AlreadyExited);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.summary(), "Selected processes had already exited");
    }

    #[test]
    fn summary_lists_denied_processes() {
        let mut terminator = ScriptedTerminator {
            outcomes: HashMap::from([(2, Err(TerminateError::PermissionDenied))]),
            calls: Vec::new(),
        };
        let report = terminate_batch(
            &mut terminator,
            vec![target(1), target(2)],
            KillMode::Graceful,
        );
        assert_eq!(
            report.summary(),
            "Terminated 1 process(es) | Access denied for: proc2 (PID: 2) - try --elevate"
        );
    }

    #[test]
    fn stale_identity_is_not_found() {
        let mut terminator = SysinfoTerminator::new();
        // Our own pid with a start time that cannot match.
        let identity = ProcessIdentity::new(std::process::id(), u64::MAX);
        assert_eq!(
            terminator.terminate(identity, KillMode::Graceful),
            Err(TerminateError::NotFound)
        );
    }
}
