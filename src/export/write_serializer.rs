//! Process-wide serialization of codec writes

use lazy_static::lazy_static;
use log::trace;
use std::sync::Mutex;

lazy_static! {
    static ref WRITE_LOCK: Mutex<()> = Mutex::new(());
}

/// Capability to enter the single process-wide write critical section
///
/// Every codec call that creates, writes or copies an output file runs
/// inside `serialize`. Reads never take the lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteSerializer;

impl WriteSerializer {
    pub fn new() -> Self {
        WriteSerializer
    }

    /// Runs `write` while holding the write lock
    pub fn serialize<T>(&self, write: impl FnOnce() -> T) -> T {
        // A panic in another writer leaves nothing behind to repair
        let _guard = WRITE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        trace!("Write lock acquired");
        write()
    }
}
