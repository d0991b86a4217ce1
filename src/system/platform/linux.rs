use std::io::ErrorKind;

use super::{MemoryAccess, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn memory_access(pid: u32) -> MemoryAccess {
        // statm is what memory figures are read from; hidepid mounts deny it
        match std::fs::File::open(format!("/proc/{pid}/statm")) {
            Ok(_) => MemoryAccess::Readable,
            Err(e) if e.kind() == ErrorKind::NotFound => MemoryAccess::Gone,
            Err(_) => MemoryAccess::Denied,
        }
    }

    fn process_listing_available() -> bool {
        std::fs::read_dir("/proc").is_ok()
    }

    fn is_elevated() -> bool {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| effective_uid(&status))
            == Some(0)
    }

    fn supports_sudo_relaunch() -> bool {
        true
    }
}

/// Parses the effective uid from `/proc/<pid>/status`.
/// The `Uid:` line holds real, effective, saved and filesystem uids.
fn effective_uid(status: &str) -> Option<u32> {
    let line = status.lines().find(|l| l.starts_with("Uid:"))?;
    line.split_whitespace().nth(2)?.parse().ok()
}
