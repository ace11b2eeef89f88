use std::ffi::OsString;

use crate::{Error, Result};

#[cfg(windows)]
use std::os::windows::ffi::OsStrExt;
#[cfg(windows)]
use windows_sys::Win32::Security::{
    CheckTokenMembership, CreateWellKnownSid, SECURITY_MAX_SID_SIZE, WinBuiltinAdministratorsSid,
};
#[cfg(windows)]
use windows_sys::Win32::UI::Shell::ShellExecuteW;
#[cfg(windows)]
use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privileges {
    Elevated,
    NotElevated,
}

/// Whether the current token belongs to the built-in Administrators group.
#[cfg(windows)]
pub fn check() -> Privileges {
    let member = unsafe {
        let mut sid = [0u8; SECURITY_MAX_SID_SIZE as usize];
        let mut sid_size: u32 = SECURITY_MAX_SID_SIZE as u32;
        let sid_ptr = sid.as_mut_ptr() as *mut core::ffi::c_void;
        if CreateWellKnownSid(WinBuiltinAdministratorsSid, std::ptr::null_mut(), sid_ptr, &mut sid_size) == 0 {
            return Privileges::NotElevated;
        }
        let mut is_member: i32 = 0;
        if CheckTokenMembership(std::ptr::null_mut(), sid_ptr as _, &mut is_member) == 0 {
            return Privileges::NotElevated;
        }
        is_member != 0
    };
    if member { Privileges::Elevated } else { Privileges::NotElevated }
}

#[cfg(not(windows))]
pub fn check() -> Privileges { Privileges::NotElevated }

/// Relaunch the current executable elevated with the given arguments and
/// leave it running. The caller is expected to exit afterwards.
#[cfg(windows)]
pub fn relaunch_elevated(args: &[OsString]) -> Result<()> {
    let exe = std::env::current_exe().map_err(Error::SelfPath)?;
    let params = quote_args(args);

    let verb = wide("runas");
    let file = wide(exe.as_os_str().to_string_lossy().as_ref());
    let parameters = wide(&params);
    let ret = unsafe {
        ShellExecuteW(
            std::ptr::null_mut(),
            verb.as_ptr(),
            file.as_ptr(),
            parameters.as_ptr(),
            std::ptr::null(),
            SW_SHOWNORMAL,
        )
    };
    // ShellExecuteW reports success with a value greater than 32
    if ret as usize > 32 {
        Ok(())
    } else {
        Err(Error::NotElevated)
    }
}

#[cfg(not(windows))]
pub fn relaunch_elevated(_args: &[OsString]) -> Result<()> {
    Err(Error::NotElevated)
}

#[cfg(windows)]
fn wide(s: &str) -> Vec<u16> {
    std::ffi::OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

/// Join arguments into a single parameter string, quoting anything with
/// whitespace so paths survive the round trip through ShellExecute.
fn quote_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| {
            let s = a.to_string_lossy();
            if s.is_empty() || s.contains(char::is_whitespace) {
                format!("\"{}\"", s)
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_args_passes_plain_tokens_through() {
        let args = vec![OsString::from("--mode"), OsString::from("startup")];
        assert_eq!(quote_args(&args), "--mode startup");
    }

    #[test]
    fn quote_args_quotes_whitespace() {
        let args = vec![OsString::from("--config"), OsString::from(r"C:\Program Files\x.json")];
        assert_eq!(quote_args(&args), r#"--config "C:\Program Files\x.json""#);
    }

    #[test]
    fn quote_args_handles_empty() {
        assert_eq!(quote_args(&[]), "");
        assert_eq!(quote_args(&[OsString::new()]), "\"\"");
    }
}
