//! Store access lock
//!
//! Grants one exclusive writer at a time. Readers are exclusive as well: a
//! read may promote or fill the LRU cache, so it mutates shared state and
//! cannot run alongside another read.

use parking_lot::{Mutex, MutexGuard};

/// Coordination primitive wrapping the state it protects
pub struct AccessLock<T> {
    inner: Mutex<T>,
}

/// Guard returned by both `read()` and `write()`
pub type AccessGuard<'a, T> = MutexGuard<'a, T>;

impl<T> AccessLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire read access (one reader at a time)
    pub fn read(&self) -> AccessGuard<'_, T> {
        self.inner.lock()
    }

    /// Acquire exclusive write access
    pub fn write(&self) -> AccessGuard<'_, T> {
        self.inner.lock()
    }
}
