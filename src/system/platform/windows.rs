use std::ffi::c_void;

use windows_sys::Win32::{
    Foundation::{CloseHandle, ERROR_ACCESS_DENIED, GetLastError, HANDLE},
    Security::{GetTokenInformation, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation},
    System::Threading::{
        GetCurrentProcess, OpenProcess, OpenProcessToken, PROCESS_QUERY_LIMITED_INFORMATION,
    },
};

use super::{MemoryAccess, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn memory_access(pid: u32) -> MemoryAccess {
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return if GetLastError() == ERROR_ACCESS_DENIED {
                    MemoryAccess::Denied
                } else {
                    MemoryAccess::Gone
                };
            }
            CloseHandle(handle);
            MemoryAccess::Readable
        }
    }

    fn process_listing_available() -> bool {
        // sysinfo enumerates through the toolhelp snapshot; an empty result is
        // treated as unavailable by the source itself
        true
    }

    /// True when the process token is elevated (run as administrator).
    fn is_elevated() -> bool {
        unsafe {
            let mut token: HANDLE = std::ptr::null_mut();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
                return false;
            }
            let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
            let mut returned = 0u32;
            let ok = GetTokenInformation(
                token,
                TokenElevation,
                &mut elevation as *mut TOKEN_ELEVATION as *mut c_void,
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &mut returned,
            );
            CloseHandle(token);
            ok != 0 && elevation.TokenIsElevated != 0
        }
    }

    // no sudo; elevation happens through UAC before launch
    fn supports_sudo_relaunch() -> bool {
        false
    }
}
