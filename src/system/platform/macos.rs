use libproc::libproc::proc_pid;
use libproc::libproc::task_info::TaskInfo;

use super::{MemoryAccess, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn memory_access(pid: u32) -> MemoryAccess {
        if proc_pid::pidinfo::<TaskInfo>(pid as i32, 0).is_ok() {
            return MemoryAccess::Readable;
        }
        // Signal 0 only checks existence; EPERM means alive but not ours
        unsafe { *libc::__error() = 0 };
        let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
        let errno = unsafe { *libc::__error() };
        if rc == 0 || errno == libc::EPERM {
            MemoryAccess::Denied
        } else {
            MemoryAccess::Gone
        }
    }

    fn process_listing_available() -> bool {
        proc_pid::name(std::process::id() as i32).is_ok()
    }

    fn is_elevated() -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    fn supports_sudo_relaunch() -> bool {
        true
    }
}
