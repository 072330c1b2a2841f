//! Core console components.
//!
//! - **terminal**: terminal device traits and the crossterm implementation
//! - **memory**: in-memory terminal for tests and headless dumps
//! - **renderer**: wrap-aware cursor placement
//! - **scrollback**: bounded log of written output
//! - **display**: shared screen state behind one lock
//! - **interceptor**: observable output stream feeding the display
//! - **session**: the console handle, dispatch and the key listener
//!
//! # Architecture
//!
//! ```text
//! Console
//! ├── InterceptedStream ──(DisplayHook)──┐
//! ├── Display (Mutex) <──────────────────┘
//! │   ├── Terminal
//! │   ├── Scrollback
//! │   ├── InputEditor (EditBuffer + HistoryRing)
//! │   └── ScreenManager
//! ├── CommandRegistry (RwLock)
//! ├── CVarStore (RwLock)
//! └── listener thread ── KeyReader
//! ```

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod display;
pub mod interceptor;
pub mod memory;
pub mod renderer;
pub mod scrollback;
pub mod session;
pub mod terminal;

/// Lock a mutex, recovering the data if a callback panicked while holding it
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
