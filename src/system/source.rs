use std::time::Duration;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use thiserror::Error;

use super::platform::{self, MemoryAccess};
use super::snapshot::{MemorySummary, ProcessIdentity, ProcessRow, Snapshot};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("process listing unavailable: {0}")]
    Unavailable(String),
    #[error("sampling took longer than {0:?}")]
    TimedOut(Duration),
}

/// Produces snapshots of the OS process table.
///
/// Implementations are driven from a blocking worker thread, never from the
/// interaction thread. A failure means the listing itself could not be
/// queried; a process vanishing mid-enumeration is simply left out.
pub trait SnapshotSource: Send {
    fn sample(&mut self) -> Result<Snapshot, SourceError>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn sample(&mut self) -> Result<Snapshot, SourceError> {
        (**self).sample()
    }
}

pub struct SysinfoSource {
    sys: System,
    max_rows: usize,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        SysinfoSource {
            sys: System::new(),
            max_rows: 0,
        }
    }

    /// Keeps only the `max_rows` largest processes; 0 keeps all.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    fn memory_summary(&self) -> MemorySummary {
        MemorySummary {
            total_bytes: self.sys.total_memory(),
            used_bytes: self.sys.used_memory(),
            available_bytes: self.sys.available_memory(),
        }
    }
}

impl SnapshotSource for SysinfoSource {
    fn sample(&mut self) -> Result<Snapshot, SourceError> {
        let _sample_span = tracing::debug_span!("source.sample").entered();

        if !platform::process_listing_available() {
            return Err(SourceError::Unavailable(
                "the OS process table cannot be read".to_string(),
            ));
        }

        self.sys.refresh_memory();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        if self.sys.processes().is_empty() {
            return Err(SourceError::Unavailable(
                "process enumeration returned no entries".to_string(),
            ));
        }

        let rows: Vec<ProcessRow> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter_map(|(pid, process)| {
                let pid = pid.as_u32();
                probe_row(
                    ProcessIdentity::new(pid, process.start_time()),
                    process.name().to_string_lossy().to_string(),
                    process.memory(),
                    platform::memory_access(pid),
                )
            })
            .collect();

        tracing::debug!(rows = rows.len(), "sampled process table");
        Ok(Snapshot::new(rows, self.memory_summary()).top(self.max_rows))
    }
}

fn probe_row(
    identity: ProcessIdentity,
    name: String,
    memory_bytes: u64,
    access: MemoryAccess,
) -> Option<ProcessRow> {
    match access {
        MemoryAccess::Gone => None,
        MemoryAccess::Denied => Some(ProcessRow {
            identity,
            name,
            memory_bytes: 0,
            access_denied: true,
        }),
        MemoryAccess::Readable => Some(ProcessRow {
            identity,
            name,
            memory_bytes,
            access_denied: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_process_is_skipped() {
        let row = probe_row(ProcessIdentity::new(1, 1), "x".into(), 42, MemoryAccess::Gone);
        assert!(row.is_none());
    }

    #[test]
    fn denied_process_stays_with_zero_memory() {
        let row = probe_row(
            ProcessIdentity::new(1, 1),
            "secret".into(),
            4096,
            MemoryAccess::Denied,
        )
        .unwrap();
        assert_eq!(row.memory_bytes, 0);
        assert!(row.access_denied);
    }

    #[test]
    fn samples_include_own_process() {
        let mut source = SysinfoSource::new();
        let snapshot = source.sample().expect("sample should succeed on a live host");
        let own = std::process::id();
        assert!(snapshot.rows().iter().any(|r| r.pid() == own));
        assert!(snapshot.memory().total_bytes > 0);
        assert!(
            snapshot
                .rows()
                .windows(2)
                .all(|w| w[0].memory_bytes >= w[1].memory_bytes)
        );
    }

    #[test]
    fn max_rows_caps_snapshot() {
        let mut source = SysinfoSource::new().with_max_rows(1);
        let snapshot = source.sample().expect("sample should succeed on a live host");
        assert_eq!(snapshot.len(), 1);
    }
}
