//=========================================================================
// Core
//
// Input pipeline subsystems and the pieces they share.
//
// Notes:
// Every mutex in the crate is taken through `lock`, which recovers from
// poisoning. The data behind each lock stays structurally valid when a
// listener or device panics, so continuing is preferable to cascading
// the panic into the polling thread or the logic tick.
//
//=========================================================================

//=== External Dependencies ===============================================
use std::sync::{Mutex, MutexGuard, PoisonError};

//=== Public Modules ======================================================
pub mod error;
pub mod input;

//=== Locking =============================================================

/// Locks `mutex`, ignoring poisoning.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
