//! Cross-process regeneration lock using advisory file locking (fs2 flock).
//!
//! Serializes every batch that rewrites the wrapper directory (generate,
//! remove, cleanup) so an external reader never observes a half-updated
//! wrapper set. Acquisition polls at a fixed interval and gives up with a
//! distinct [`FplaunchError::LockTimeout`] instead of hanging.
//!
//! Each lock is two files in the lock directory:
//! - `{name}.lock`: the advisory lock itself, never deleted
//! - `{name}.lock.pid`: the owner's PID as decimal text, written atomically
//!
//! A crashed owner's flock is dropped by the kernel with its descriptor, so
//! no process ever has to "steal" a lock. The PID record is removed only by
//! the process whose PID it holds.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::atomic::write_atomically;
use crate::error::{FplaunchError, Result};
use crate::security::ensure_contained;

/// Lock guarding the wrapper directory during generate/remove/cleanup.
pub const REGENERATE_LOCK: &str = "regenerate";

/// Default polling interval between acquisition attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Named advisory locks rooted in a directory inside the home directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    dir: PathBuf,
    poll_interval: Duration,
}

/// RAII guard that releases the lock on drop.
#[derive(Debug)]
pub struct LockHandle {
    name: String,
    file: File,
    pid_path: PathBuf,
    owner_pid: u32,
    released: bool,
}

impl LockManager {
    /// Create a manager whose lock files live in `lock_dir`.
    ///
    /// Fails with `PathEscapesHome` if `lock_dir` resolves outside `home`.
    pub fn new(lock_dir: &Path, home: &Path) -> Result<Self> {
        let dir = ensure_contained(lock_dir, home)?;
        fs::create_dir_all(&dir).map_err(|e| FplaunchError::io(&dir, e))?;
        Ok(Self {
            dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", name))
    }

    fn pid_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock.pid", name))
    }

    /// Poll until the lock is ours or `timeout` elapses.
    ///
    /// A timeout too large to represent as an `Instant` means no deadline.
    pub fn acquire(&self, name: &str, timeout: Duration) -> Result<LockHandle> {
        let start = Instant::now();
        let deadline = start.checked_add(timeout);

        loop {
            if let Some(handle) = self.try_acquire(name)? {
                debug!("Acquired lock '{}' after {:?}", name, start.elapsed());
                return Ok(handle);
            }

            let now = Instant::now();
            if let Some(deadline) = deadline
                && now >= deadline
            {
                let owner = self.owner(name);
                if let Some(pid) = owner
                    && !owner_is_running(pid)
                {
                    warn!(
                        "Lock '{}' records PID {} which is not running; leaving it alone",
                        name, pid
                    );
                }
                return Err(FplaunchError::LockTimeout {
                    name: name.to_string(),
                    waited: start.elapsed(),
                    owner,
                });
            }

            let wait = match deadline {
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };
            thread::sleep(wait);
        }
    }

    /// Non-blocking try-acquire; returns `None` if another holder has it.
    pub fn try_acquire(&self, name: &str) -> Result<Option<LockHandle>> {
        validate_lock_name(name)?;

        let path = self.lock_path(name);
        let file = open_lock_file(&path).map_err(|e| FplaunchError::io(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
            #[cfg(unix)]
            Err(ref e) if e.raw_os_error() == Some(35) || e.raw_os_error() == Some(11) => {
                // EAGAIN(11) / EWOULDBLOCK(35 on macOS): lock contention
                return Ok(None);
            }
            Err(e) => return Err(FplaunchError::io(&path, e)),
        }

        let owner_pid = std::process::id();
        let pid_path = self.pid_path(name);
        write_atomically(&pid_path, owner_pid.to_string().as_bytes(), Some(0o600))?;

        Ok(Some(LockHandle {
            name: name.to_string(),
            file,
            pid_path,
            owner_pid,
            released: false,
        }))
    }

    /// PID recorded for `name`, if any.
    pub fn owner(&self, name: &str) -> Option<u32> {
        read_pid(&self.pid_path(name))
    }
}

impl LockHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_pid(&self) -> u32 {
        self.owner_pid
    }

    /// Release explicitly. Dropping the handle has the same effect.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match read_pid(&self.pid_path) {
            Some(pid) if pid == self.owner_pid => {
                if let Err(e) = fs::remove_file(&self.pid_path) {
                    debug!("Failed to remove {}: {}", self.pid_path.display(), e);
                }
            }
            other => {
                warn!(
                    "Lock '{}' owner record is {:?}, not our PID {}; leaving it in place",
                    self.name, other, self.owner_pid
                );
            }
        }

        let _ = self.file.unlock();
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

fn validate_lock_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 100
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FplaunchError::InvalidName(name.to_string()))
    }
}

/// Open (or create) the lock file without following a planted symlink and
/// without truncating it.
fn open_lock_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW).mode(0o600);
    }

    options.open(path)
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn owner_is_running(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks that the pid exists; EPERM still means the process exists.
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn owner_is_running(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Barrier};

    /// Helper to create a LockManager inside a temp "home"
    fn test_manager(home: &Path) -> LockManager {
        LockManager::new(&home.join(".config/fplaunchwrapper/locks"), home)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn acquire_and_release() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());

        let handle = manager.acquire(REGENERATE_LOCK, Duration::from_secs(1)).unwrap();
        assert_eq!(handle.owner_pid(), std::process::id());
        assert_eq!(manager.owner(REGENERATE_LOCK), Some(std::process::id()));

        handle.release();
        assert_eq!(manager.owner(REGENERATE_LOCK), None);

        // Can re-acquire after release
        let _again = manager.acquire(REGENERATE_LOCK, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());

        let held = manager.acquire(REGENERATE_LOCK, Duration::from_secs(1)).unwrap();

        let started = Instant::now();
        let err = manager
            .acquire(REGENERATE_LOCK, Duration::from_millis(150))
            .unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(150));
        match err {
            FplaunchError::LockTimeout { name, owner, .. } => {
                assert_eq!(name, REGENERATE_LOCK);
                assert_eq!(owner, Some(std::process::id()));
            }
            other => panic!("expected LockTimeout, got {:?}", other),
        }

        drop(held);
        assert!(manager.try_acquire(REGENERATE_LOCK).unwrap().is_some());
    }

    #[test]
    fn waiter_succeeds_after_release() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());

        let held = manager.acquire(REGENERATE_LOCK, Duration::from_secs(1)).unwrap();
        let waiter = {
            let manager = manager.clone();
            thread::spawn(move || manager.acquire(REGENERATE_LOCK, Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(100));
        drop(held);

        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn unbounded_timeout_waits_instead_of_overflowing() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());

        // Free lock: an enormous timeout must not panic computing the deadline.
        let handle = manager
            .acquire(REGENERATE_LOCK, Duration::from_secs(u64::MAX))
            .unwrap();

        let waiter = {
            let manager = manager.clone();
            thread::spawn(move || manager.acquire(REGENERATE_LOCK, Duration::MAX))
        };
        thread::sleep(Duration::from_millis(100));
        drop(handle);

        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn release_leaves_foreign_owner_record() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());

        let handle = manager.acquire("batch", Duration::from_secs(1)).unwrap();
        // A newer owner's record must not be destroyed by a slow process.
        fs::write(manager.pid_path("batch"), "999999").unwrap();
        handle.release();

        assert_eq!(manager.owner("batch"), Some(999999));
    }

    #[test]
    fn invalid_lock_names_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());

        for bad in ["", "../escape", "a/b", "name with space"] {
            assert!(matches!(
                manager.try_acquire(bad),
                Err(FplaunchError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn lock_dir_outside_home_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).unwrap();

        let err = LockManager::new(&tmp.path().join("elsewhere"), &home).unwrap_err();
        assert!(matches!(err, FplaunchError::PathEscapesHome { .. }));
    }

    #[test]
    fn concurrent_threads_serialize() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = test_manager(tmp.path());
        let inside = Arc::new(AtomicU32::new(0));
        let completed = Arc::new(AtomicU32::new(0));
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let m = manager.clone();
                let inside = inside.clone();
                let completed = completed.clone();
                let b = barrier.clone();
                thread::spawn(move || {
                    b.wait(); // all threads start together
                    let _guard = m.acquire(REGENERATE_LOCK, Duration::from_secs(10)).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(Duration::from_millis(20));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(completed.load(Ordering::SeqCst), 3);
    }
}
