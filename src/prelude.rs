//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_input::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Errors
pub use crate::core::error::{InputError, InputResult};

// Handles and registries
pub use crate::core::input::{
    AxisHandle, AxisRegistry, Handle, HandleRegistry, KeyHandle, KeyRegistry, MapHandle,
    SourceHandle,
};

// Events
pub use crate::core::input::{EventBuffer, InputEvent, InputEventKind};

// Collaborators
pub use crate::core::input::{InputDevice, InputIgnoreTarget, VirtualKeyboard};

// Manager and bindings
pub use crate::core::input::{InputManager, InputManagerBuilder, InputSystem, ListenerId};
