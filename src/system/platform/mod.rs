/// Outcome of probing whether a process's memory figures can be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryAccess {
    Readable,
    Denied,
    /// The process exited between enumeration and the probe.
    Gone,
}

pub trait PlatformExtensions {
    fn memory_access(pid: u32) -> MemoryAccess;
    fn process_listing_available() -> bool;
    fn is_elevated() -> bool;
    fn supports_sudo_relaunch() -> bool;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(target_os = "windows")]
use windows as platform_impl;

pub fn memory_access(pid: u32) -> MemoryAccess {
    platform_impl::Platform::memory_access(pid)
}

pub fn process_listing_available() -> bool {
    platform_impl::Platform::process_listing_available()
}

pub fn is_elevated() -> bool {
    platform_impl::Platform::is_elevated()
}

pub fn supports_sudo_relaunch() -> bool {
    platform_impl::Platform::supports_sudo_relaunch()
}
