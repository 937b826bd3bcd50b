mod regen_lock;

pub use regen_lock::{DEFAULT_POLL_INTERVAL, LockHandle, LockManager, REGENERATE_LOCK};
