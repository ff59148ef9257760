//! Advisory lock around reads and writes of the directory files.
//!
//! Takes an exclusive POSIX record lock on the same file glibc's `lckpwdf`
//! uses (`/etc/.pwd.lock` by default), so shadow-utils commands and this tool
//! do not write the account files at the same time.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

/// Same budget `lckpwdf` gives itself.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(15);
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Held lock; released on drop.
#[derive(Debug)]
pub struct DirectoryLock {
    file: File,
    path: PathBuf,
}

impl DirectoryLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        Self::acquire_with_timeout(path, LOCK_TIMEOUT)
    }

    pub fn acquire_with_timeout(path: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        let started = Instant::now();
        loop {
            match set_lock(&file, libc::F_WRLCK as libc::c_int) {
                Ok(()) => break,
                Err(e) if is_contended(&e) => {
                    if started.elapsed() >= timeout {
                        return Err(Error::io(
                            path,
                            io::Error::new(io::ErrorKind::TimedOut, "timed out waiting for lock"),
                        ));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::io(path, e)),
            }
        }
        debug!(path = %path.display(), "acquired directory lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well.
        let _ = set_lock(&self.file, libc::F_UNLCK as libc::c_int);
    }
}

fn set_lock(file: &File, kind: libc::c_int) -> io::Result<()> {
    // SAFETY: an all-zero `flock` is a valid value; the fields we rely on are set below.
    let mut fl: libc::flock = unsafe { std::mem::zeroed() };
    fl.l_type = kind as _;
    fl.l_whence = libc::SEEK_SET as _;
    fl.l_start = 0;
    fl.l_len = 0;
    // SAFETY: the descriptor is owned by `file` and `fl` outlives the call.
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLK, &fl as *const libc::flock) };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn is_contended(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(code) if code == libc::EAGAIN || code == libc::EACCES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_file_is_created_and_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pwd.lock");
        {
            let lock = DirectoryLock::acquire(&path).unwrap();
            assert_eq!(lock.path(), path.as_path());
            assert!(path.exists());
        }
        // Record locks are per process, so re-acquiring after drop must succeed.
        DirectoryLock::acquire_with_timeout(&path, Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn missing_lock_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join(".pwd.lock");
        let err = DirectoryLock::acquire(&path).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
