//=========================================================================
// Input Errors
//=========================================================================
//
// Error type shared by the handle registries, the input manager and the
// binding engine.
//
// Every failure in the input pipeline is observational: callers get a
// value back and a log line is emitted, nothing here aborts the process.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== InputError ==========================================================

/// Errors reported by the input pipeline.
#[derive(Debug, Error)]
pub enum InputError {
    /// The handle was never added to the registry it was looked up in.
    ///
    /// Distinct from a registered handle whose name is empty.
    #[error("handle 0x{0:08x} is not registered")]
    HandleNotFound(u32),

    /// No axis or button binding targets the mapping name.
    #[error("no binding targets mapping '{0}'")]
    UnboundMapping(String),

    /// `initialize` was called on a manager that is already running.
    #[error("input manager is already initialized")]
    AlreadyInitialized,

    /// The OS refused to create the polling thread.
    #[error("failed to spawn input polling thread")]
    WorkerSpawn(#[source] std::io::Error),

    /// A device reported failure from its own `initialize`.
    #[error("device '{0}' failed to initialize")]
    DeviceInitialization(String),

    /// The same device allocation is already in the polled set.
    #[error("device '{0}' is already registered")]
    DeviceAlreadyRegistered(String),
}

/// Convenience alias used across the input modules.
pub type InputResult<T> = Result<T, InputError>;

//=========================================================================
// Unit Tests
//=========================================================================
