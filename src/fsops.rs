use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::{Error, Result};

#[cfg(windows)]
use std::os::windows::ffi::OsStrExt;
#[cfg(windows)]
use std::os::windows::fs::MetadataExt;
#[cfg(windows)]
use windows_sys::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_DELAY_UNTIL_REBOOT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearStats {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
    /// Entries that could not be removed (locked, access denied). Logged and
    /// left behind; the sweep continues past them.
    pub skipped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The directory does not exist. Benign.
    Missing,
    /// The directory exists and had nothing in it.
    AlreadyEmpty,
    Cleared(ClearStats),
}

/// Remove everything inside `dir` while keeping the directory itself.
///
/// Entry-level failures are logged and counted, never fatal. With `dry_run`
/// the same walk happens but nothing is deleted.
pub fn clear_dir_contents(dir: &Path, dry_run: bool) -> Result<ClearOutcome> {
    if !dir.exists() {
        return Ok(ClearOutcome::Missing);
    }
    let rd = fs::read_dir(dir).map_err(|e| Error::io(format!("reading {}", dir.display()), e))?;

    let mut stats = ClearStats::default();
    let mut seen = false;
    for entry in rd {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("{}: unreadable entry: {}", dir.display(), e);
                stats.skipped += 1;
                continue;
            }
        };
        seen = true;
        let p = entry.path();
        if is_reparse_point(&p) {
            // Remove the link itself without traversing into it
            if dry_run {
                debug!("[dry-run] would remove link: {}", p.display());
                stats.dirs += 1;
                continue;
            }
            if fs::remove_dir(&p).or_else(|_| fs::remove_file(&p)).is_ok() {
                stats.dirs += 1;
            } else {
                warn!("could not remove link: {}", p.display());
                stats.skipped += 1;
            }
        } else if p.is_dir() {
            let (bytes, files, dirs) = compute_dir_stats(&p);
            if dry_run {
                debug!("[dry-run] would remove dir: {} ({} files, {})", p.display(), files, format_bytes(bytes));
                stats.bytes += bytes;
                stats.files += files;
                stats.dirs += dirs + 1;
                continue;
            }
            set_writable(&p);
            if fs::remove_dir_all(&p).is_ok() {
                stats.bytes += bytes;
                stats.files += files;
                stats.dirs += dirs + 1;
            } else {
                warn!("could not remove dir: {}", p.display());
                stats.skipped += 1;
            }
        } else {
            let size = fs::metadata(&p).map(|m| m.len()).unwrap_or(0);
            if dry_run {
                debug!("[dry-run] would remove file: {} ({} bytes)", p.display(), size);
                stats.bytes += size;
                stats.files += 1;
                continue;
            }
            set_writable(&p);
            if fs::remove_file(&p).is_ok() {
                stats.bytes += size;
                stats.files += 1;
            } else if schedule_delete_on_reboot(&p) {
                // Locked file (the simulator may still hold it); the OS will
                // drop it on the next boot.
                debug!("scheduled for deletion on reboot: {}", p.display());
                stats.bytes += size;
                stats.files += 1;
            } else {
                warn!("could not remove file: {}", p.display());
                stats.skipped += 1;
            }
        }
    }

    if !seen && stats.skipped == 0 {
        Ok(ClearOutcome::AlreadyEmpty)
    } else {
        Ok(ClearOutcome::Cleared(stats))
    }
}

/// Remove a single file; absence is benign. Returns whether it existed.
pub fn remove_file_if_present(path: &Path, dry_run: bool) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    if dry_run {
        debug!("[dry-run] would remove file: {}", path.display());
        return Ok(true);
    }
    set_writable(path);
    fs::remove_file(path).map_err(|e| Error::io(format!("removing {}", path.display()), e))?;
    Ok(true)
}

fn compute_dir_stats(root: &Path) -> (u64, u64, u64) {
    // bytes, files, dirs (excluding root)
    let mut bytes: u64 = 0;
    let mut files: u64 = 0;
    let mut dirs: u64 = 0;
    if !root.is_dir() { return (0, 0, 0); }
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(d) = stack.pop() {
        if let Ok(rd) = fs::read_dir(&d) {
            for e in rd.flatten() {
                let p = e.path();
                if is_reparse_point(&p) { continue; }
                if p.is_dir() {
                    dirs += 1;
                    stack.push(p);
                } else {
                    files += 1;
                    bytes = bytes.saturating_add(fs::metadata(&p).map(|m| m.len()).unwrap_or(0));
                }
            }
        }
    }
    (bytes, files, dirs)
}

fn set_writable(path: &Path) {
    if let Ok(metadata) = fs::metadata(path) {
        let mut perms = metadata.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            let _ = fs::set_permissions(path, perms);
        }
    }
}

#[cfg(windows)]
fn is_reparse_point(p: &Path) -> bool {
    if let Ok(md) = fs::symlink_metadata(p) {
        // FILE_ATTRIBUTE_REPARSE_POINT = 0x0400
        (md.file_attributes() & 0x0400) != 0
    } else {
        false
    }
}

#[cfg(not(windows))]
fn is_reparse_point(_p: &Path) -> bool { false }

#[cfg(windows)]
fn schedule_delete_on_reboot(p: &Path) -> bool {
    // MoveFileExW(path, NULL, MOVEFILE_DELAY_UNTIL_REBOOT)
    let wide: Vec<u16> = p.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
    unsafe { MoveFileExW(wide.as_ptr(), std::ptr::null(), MOVEFILE_DELAY_UNTIL_REBOOT) != 0 }
}

#[cfg(not(windows))]
fn schedule_delete_on_reboot(_p: &Path) -> bool { false }

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{} {}", bytes, UNITS[unit]) } else { format!("{:.2} {}", size, UNITS[unit]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn populate(dir: &Path) {
        let sub = dir.join("replays");
        fs::create_dir(&sub).unwrap();
        File::create(sub.join("swing1.rec")).unwrap().write_all(b"0123456789").unwrap();
        File::create(dir.join("index.db")).unwrap().write_all(b"abcdef").unwrap();
    }

    #[test]
    fn missing_dir_is_benign() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = clear_dir_contents(&tmp.path().join("nope"), false).unwrap();
        assert_eq!(outcome, ClearOutcome::Missing);
    }

    #[test]
    fn empty_dir_reports_already_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = clear_dir_contents(tmp.path(), false).unwrap();
        assert_eq!(outcome, ClearOutcome::AlreadyEmpty);
        assert!(tmp.path().is_dir());
    }

    #[test]
    fn mixed_contents_are_removed_but_dir_remains() {
        let tmp = tempfile::tempdir().unwrap();
        populate(tmp.path());
        let outcome = clear_dir_contents(tmp.path(), false).unwrap();
        match outcome {
            ClearOutcome::Cleared(stats) => {
                assert_eq!(stats.files, 2);
                assert_eq!(stats.dirs, 1);
                assert_eq!(stats.bytes, 16);
                assert_eq!(stats.skipped, 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(tmp.path().is_dir());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn dry_run_leaves_everything_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        populate(tmp.path());
        let outcome = clear_dir_contents(tmp.path(), true).unwrap();
        assert!(matches!(outcome, ClearOutcome::Cleared(s) if s.files == 2));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn remove_file_if_present_is_benign_on_absence() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!remove_file_if_present(&tmp.path().join("gone.json"), false).unwrap());
        let f = tmp.path().join("there.json");
        File::create(&f).unwrap();
        assert!(remove_file_if_present(&f, false).unwrap());
        assert!(!f.exists());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
    }
}
