//=========================================================================
// Aetheric Input — Library Root
//
// This crate defines a threaded input-event pipeline: devices are polled
// on a background thread, events are queued and dispatched to listeners
// once per logic tick, and a binding engine turns raw keys and axes into
// named mappings.
//
// Responsibilities:
// - Expose the input manager, binding engine and their collaborators
// - Keep locking and queue internals crate-private
//
// Typical usage:
// ```no_run
// use std::sync::Arc;
// use aetheric_input::prelude::*;
//
// fn main() -> Result<(), InputError> {
//     let keys = Arc::new(KeyRegistry::with_default_keys());
//     let manager = InputManager::new(keys);
//
//     let mut input = InputSystem::new();
//     input.bind_axis("MoveForward", "Key_W", 1.0);
//     input.init(&manager);
//     manager.initialize()?;
//
//     loop {
//         manager.process_events();
//         let _forward = input.get_axis("MoveForward");
//     }
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the input subsystems and the crate error type.
//
pub mod core;
pub mod prelude;

//--- Public Exports ------------------------------------------------------
//
// The two types most applications construct directly.
//
pub use crate::core::error::{InputError, InputResult};
pub use crate::core::input::{InputManager, InputSystem};
