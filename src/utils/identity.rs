// gpbackuptool/src/utils/identity.rs
use anyhow::{Context, Result};
use std::ffi::CStr;

/// Name of the OS user this process runs as, resolved from the passwd entry
/// for the real uid.
pub fn current_username() -> Result<String> {
    let uid = unsafe { libc::getuid() };

    let mut passwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    let mut buf = vec![0 as libc::c_char; 1024];

    loop {
        let rc = unsafe {
            libc::getpwuid_r(
                uid,
                &mut passwd,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        if rc == 0 {
            break;
        }
        if rc == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        return Err(std::io::Error::from_raw_os_error(rc))
            .with_context(|| format!("getpwuid_r failed for uid {uid}"));
    }

    if result.is_null() {
        anyhow::bail!("No passwd entry for uid {uid}");
    }

    let name = unsafe { CStr::from_ptr(passwd.pw_name) };
    Ok(name
        .to_str()
        .context("Current user name is not valid UTF-8")?
        .to_string())
}

/// The backup job may only run as the configured OS user; anything else is a
/// fatal startup error.
pub fn ensure_running_as(expected: &str) -> Result<()> {
    let actual = current_username()?;
    if actual != expected {
        anyhow::bail!("This program can only be executed as {expected}, currently running as {actual}");
    }
    Ok(())
}
