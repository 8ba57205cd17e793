//=========================================================================
// Input
//
// Everything between a physical device and a named gameplay mapping.
//
// Responsibilities:
// - Turn names into stable handles and keep the registered key set
// - Collect events from devices on a background polling thread
// - Dispatch queued events to prioritized listeners once per logic tick
// - Resolve key/axis events into named axis and button mappings
//
// Pipeline:
// ```text
//  InputDevice::poll ─┐
//  push_*() ──────────┼─▶ InputManager queue ─▶ listeners ─▶ InputSystem
//                     │        (event lock)       (prio)     get_axis()
//  VirtualKeyboard ───┘ (filter at dispatch)                 get_button()
// ```
//
//=========================================================================

//=== Submodules ==========================================================
pub mod device;
pub mod event;
pub mod event_queue;
pub mod handle;
pub mod input_manager;
pub mod input_system;
pub mod registry;
pub mod virtual_keyboard;

//=== Public Exports ======================================================
pub use device::InputDevice;
pub use event::{EventBuffer, InputEvent, InputEventKind};
pub use event_queue::{InputListener, ListenerId};
pub use handle::{hash_name, AxisHandle, Handle, KeyHandle, MapHandle, SourceHandle};
pub use input_manager::{InputManager, InputManagerBuilder};
pub use input_system::InputSystem;
pub use registry::{AxisRegistry, HandleRegistry, KeyRegistry};
pub use virtual_keyboard::{InputIgnoreTarget, VirtualKeyboard};
