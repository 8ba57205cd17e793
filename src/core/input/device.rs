//=========================================================================
// Device Interface
//=========================================================================
//
// Contract for the pollable devices the input manager drives but does
// not implement.
//
// Architecture:
//   polling worker → InputDevice::poll(&mut EventBuffer)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

//=== Internal Dependencies ===============================================

use super::event::EventBuffer;

//=== InputDevice =========================================================

/// Something the polling worker can ask for fresh input.
///
/// Devices are owned by the caller and shared with the manager as
/// `Arc<dyn InputDevice>`. The manager identifies them by allocation, so
/// a second registration of a clone of the same `Arc` is rejected.
///
/// # Contract
///
/// - `poll` is called once per worker iteration and must return promptly;
///   a `poll` that never returns stalls [`InputManager::shutdown`].
/// - A panic inside `poll` is caught and logged with the device name; the
///   worker keeps polling, including the device that panicked.
/// - `destroy` is called exactly once by the manager, after the device
///   has been removed from the polled set.
///
/// [`InputManager::shutdown`]: super::InputManager::shutdown
pub trait InputDevice: Send + Sync {
    /// Acquires device resources. Returns `false` on failure.
    fn initialize(&self) -> bool;

    /// Releases device resources.
    fn destroy(&self);

    /// Pushes whatever happened since the previous poll into `events`.
    fn poll(&self, events: &mut EventBuffer);

    /// Human-readable device name, used in logs.
    fn name(&self) -> String;

    /// Local player this device belongs to.
    fn player_id(&self) -> i32;
}

/// Returns `true` when both handles point at the same device allocation.
pub(crate) fn same_device(a: &Arc<dyn InputDevice>, b: &Arc<dyn InputDevice>) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

//=========================================================================
// Unit Tests
//=========================================================================
