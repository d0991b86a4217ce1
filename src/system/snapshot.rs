use std::cmp::Ordering;

use chrono::{DateTime, Local};

/// Stable key for a process across refreshes.
///
/// A pid alone is reused by the OS once a process exits, so the start time
/// (seconds since the epoch, as reported by the OS) disambiguates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub start_time: u64,
}

impl ProcessIdentity {
    pub fn new(pid: u32, start_time: u64) -> Self {
        Self { pid, start_time }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRow {
    pub identity: ProcessIdentity,
    pub name: String,
    pub memory_bytes: u64,
    /// The OS refused to report memory for this process; `memory_bytes` is 0.
    pub access_denied: bool,
}

impl ProcessRow {
    pub fn pid(&self) -> u32 {
        self.identity.pid
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemorySummary {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

impl MemorySummary {
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.total_bytes as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// One consistent view of the process table and system memory.
///
/// Rows are sorted by memory descending, pid ascending on ties. The ordering
/// is established here so every producer (real or test) gets it for free.
#[derive(Clone, Debug)]
pub struct Snapshot {
    rows: Vec<ProcessRow>,
    memory: MemorySummary,
    captured_at: DateTime<Local>,
}

impl Snapshot {
    pub fn new(rows: Vec<ProcessRow>, memory: MemorySummary) -> Self {
        Self::captured(rows, memory, Local::now())
    }

    pub fn captured(
        mut rows: Vec<ProcessRow>,
        memory: MemorySummary,
        captured_at: DateTime<Local>,
    ) -> Self {
        rows.sort_by(row_order);
        Self {
            rows,
            memory,
            captured_at,
        }
    }

    /// Keeps the `limit` largest rows; 0 means no limit.
    pub fn top(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.rows.truncate(limit);
        }
        self
    }

    pub fn rows(&self) -> &[ProcessRow] {
        &self.rows
    }

    pub fn memory(&self) -> MemorySummary {
        self.memory
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = ProcessIdentity> + '_ {
        self.rows.iter().map(|r| r.identity)
    }

    pub fn position(&self, identity: ProcessIdentity) -> Option<usize> {
        self.rows.iter().position(|r| r.identity == identity)
    }

    pub fn row_memory_percent(&self, row: &ProcessRow) -> f64 {
        if self.memory.total_bytes == 0 {
            return 0.0;
        }
        row.memory_bytes as f64 / self.memory.total_bytes as f64 * 100.0
    }
}

fn row_order(a: &ProcessRow, b: &ProcessRow) -> Ordering {
    b.memory_bytes
        .cmp(&a.memory_bytes)
        .then_with(|| a.identity.pid.cmp(&b.identity.pid))
}
