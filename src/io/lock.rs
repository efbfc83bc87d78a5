use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock over a `.nova` directory.
///
/// Held around every cache write, and around the whole load-change-save
/// cycle of the task list (`LocalCache::update_tasks`). Project, mission and
/// history files are written whole from one process's state; the last
/// writer wins. Not reentrant. Backed by `flock` on Unix.
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not acquire lock on {path}: another nova process is writing")]
    Timeout { path: PathBuf },
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

impl FileLock {
    /// Lock `dir/.lock`, waiting up to `timeout`
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Create {
                path: path.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        while try_lock(&file).is_err() {
            if Instant::now() >= deadline {
                return Err(LockError::Timeout { path });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(FileLock { _file: file, path })
    }

    pub fn acquire_default(dir: &Path) -> Result<Self, LockError> {
        Self::acquire(dir, DEFAULT_TIMEOUT)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // flock is released with the descriptor
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_is_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = FileLock::acquire_default(tmp.path()).unwrap();
        assert!(tmp.path().join(".lock").exists());
        drop(lock);
        assert!(FileLock::acquire_default(tmp.path()).is_ok());
    }

    #[test]
    fn second_holder_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = FileLock::acquire_default(tmp.path()).unwrap();
        let err = FileLock::acquire(tmp.path(), Duration::from_millis(30));
        assert!(matches!(err, Err(LockError::Timeout { .. })));
    }
}
