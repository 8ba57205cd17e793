//=========================================================================
// Input System
//
// Translates raw key and axis activity into named, application-facing
// mappings ("MoveForward", "Jump") and stores the latest resolved value
// of each.
//
// Architecture:
// ```text
//  InputManager::process_events()
//          ↓  (listener, normal priority)
//  BindingState::resolve(event)
//          ├─ KeyStateChange → axis binding?   → scale or 0.0
//          │                 → button binding? → pressed
//          └─ AxisChange     → axis binding?   → value * scale
//          ↓
//  axis_values / button_values ← get_axis() / get_button()
// ```
//
// Concurrency:
// - Binding tables and resolved values live behind one mutex shared with
//   the registered listener.
// - The listener runs under the manager's event lock, so the lock order
//   is always event lock → binding lock. Nothing here takes the event
//   lock while holding the binding lock.
//
// Resolution Rules:
// - An axis binding wins over a button binding for the same key.
// - One source may feed several mappings; all of them are written.
// - Several sources may feed one mapping; the last resolved one wins.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use log::{debug, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::event::InputEvent;
use super::event_queue::ListenerId;
use super::handle::{MapHandle, SourceHandle};
use super::input_manager::InputManager;
use super::registry::HandleRegistry;
use crate::core::error::{InputError, InputResult};
use crate::core::lock;

//=== AxisBinding =========================================================

/// One source → mapping association of the axis table.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisBinding {
    mapping: MapHandle,
    scale: f32,
}

//=== BindingState ========================================================

/// Everything guarded by the binding lock.
#[derive(Debug, Default)]
struct BindingState {
    maps: HandleRegistry<MapHandle>,
    sources: HandleRegistry<SourceHandle>,

    axis_bindings: HashMap<SourceHandle, Vec<AxisBinding>>,
    button_bindings: HashMap<SourceHandle, Vec<MapHandle>>,

    axis_values: HashMap<MapHandle, f32>,
    button_values: HashMap<MapHandle, bool>,
}

impl BindingState {
    //--- Resolution -------------------------------------------------------

    /// Applies one event to the resolved values. Returns `true` if any
    /// binding matched.
    fn resolve(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::KeyStateChange { key, pressed } => {
                let source = SourceHandle::from(key);
                if self.resolve_axis(source, |scale| if pressed { scale } else { 0.0 }) {
                    return true;
                }
                self.resolve_button(source, pressed)
            }
            InputEvent::AxisChange { axis, value } => {
                self.resolve_axis(SourceHandle::from(axis), |scale| value * scale)
            }
            _ => false,
        }
    }

    fn resolve_axis(&mut self, source: SourceHandle, value_for: impl Fn(f32) -> f32) -> bool {
        let Some(bindings) = self.axis_bindings.get(&source) else {
            return false;
        };

        for binding in bindings {
            let value = value_for(binding.scale);
            self.axis_values.insert(binding.mapping, value);
            debug!(
                target: "input_system",
                "Axis map '{}' = {}",
                self.maps.name(binding.mapping).unwrap_or("?"),
                value
            );
        }

        !bindings.is_empty()
    }

    fn resolve_button(&mut self, source: SourceHandle, pressed: bool) -> bool {
        let Some(mappings) = self.button_bindings.get(&source) else {
            return false;
        };

        for &mapping in mappings {
            self.button_values.insert(mapping, pressed);
            debug!(
                target: "input_system",
                "Button map '{}' = {}",
                self.maps.name(mapping).unwrap_or("?"),
                pressed
            );
        }

        !mappings.is_empty()
    }

    //--- Table Queries ----------------------------------------------------

    fn axis_targets(&self, mapping: MapHandle) -> bool {
        self.axis_bindings
            .values()
            .flatten()
            .any(|binding| binding.mapping == mapping)
    }

    fn button_targets(&self, mapping: MapHandle) -> bool {
        self.button_bindings.values().flatten().any(|&m| m == mapping)
    }
}

//=== InputSystem =========================================================

/// Named axis and button mappings resolved from raw input.
///
/// Bind first, then call [`init`](Self::init) to start receiving events
/// from an [`InputManager`]. Bindings may also change while running.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use aetheric_input::prelude::*;
///
/// let keys = Arc::new(KeyRegistry::with_default_keys());
/// let manager = InputManager::new(keys);
///
/// let mut input = InputSystem::new();
/// input.bind_axis("MoveForward", "Key_W", 1.0);
/// input.bind_button("Jump", "Key_Space");
/// input.init(&manager);
///
/// manager.push_key_state_change(KeyHandle::from_name("Key_W"), true);
/// manager.process_events();
///
/// assert_eq!(input.get_axis("MoveForward"), 1.0);
/// assert!(!input.get_button("Jump"));
/// ```
pub struct InputSystem {
    state: Arc<Mutex<BindingState>>,
    listener: Option<ListenerId>,
}

impl InputSystem {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BindingState::default())),
            listener: None,
        }
    }

    //--- Lifecycle --------------------------------------------------------

    /// Registers the resolver as a normal-priority listener on `manager`.
    ///
    /// Calling it again without [`shutdown`](Self::shutdown) does nothing.
    pub fn init(&mut self, manager: &InputManager) {
        if self.listener.is_some() {
            warn!(target: "input_system", "Input system is already initialized");
            return;
        }

        debug!(target: "input_system", "Registering input listener...");

        let state = Arc::clone(&self.state);
        let id = manager.add_input_listener(move |event: &InputEvent| lock(&state).resolve(event), false);
        self.listener = Some(id);

        info!(target: "input_system", "Initialized input system!");
    }

    /// Removes the resolver listener from `manager`.
    ///
    /// Bindings and resolved values are kept.
    pub fn shutdown(&mut self, manager: &InputManager) {
        let Some(id) = self.listener.take() else {
            return;
        };

        if !manager.remove_input_listener(id) {
            // Manager shutdown already dropped every listener.
            debug!(target: "input_system", "Input listener was already removed");
        }

        info!(target: "input_system", "Shut down input system");
    }

    pub fn is_initialized(&self) -> bool {
        self.listener.is_some()
    }

    //--- Binding ----------------------------------------------------------

    /// Binds `source_name` (a key or axis name) to the axis mapping
    /// `map_name` with the given scale.
    ///
    /// Binding the same pair again replaces its scale.
    pub fn bind_axis(&self, map_name: &str, source_name: &str, scale: f32) {
        let mut state = lock(&self.state);
        let mapping = state.maps.add_name(map_name);
        let source = state.sources.add_name(source_name);

        let bindings = state.axis_bindings.entry(source).or_default();
        match bindings.iter_mut().find(|b| b.mapping == mapping) {
            Some(existing) => existing.scale = scale,
            None => bindings.push(AxisBinding { mapping, scale }),
        }

        debug!(
            target: "input_system",
            "Bound axis '{}' to '{}' (scale {})",
            map_name,
            source_name,
            scale
        );
    }

    /// Binds `source_name` to the button mapping `map_name`.
    pub fn bind_button(&self, map_name: &str, source_name: &str) {
        let mut state = lock(&self.state);
        let mapping = state.maps.add_name(map_name);
        let source = state.sources.add_name(source_name);

        let mappings = state.button_bindings.entry(source).or_default();
        if !mappings.contains(&mapping) {
            mappings.push(mapping);
        }

        debug!(target: "input_system", "Bound button '{}' to '{}'", map_name, source_name);
    }

    /// Removes exactly the `(source_name, map_name)` axis binding.
    ///
    /// Returns `false` if that pair was not bound.
    pub fn unbind_axis(&self, map_name: &str, source_name: &str) -> bool {
        let mapping = MapHandle::from_name(map_name);
        let source = SourceHandle::from_name(source_name);
        let mut state = lock(&self.state);

        let Some(bindings) = state.axis_bindings.get_mut(&source) else {
            return false;
        };

        let before = bindings.len();
        bindings.retain(|b| b.mapping != mapping);
        let removed = bindings.len() != before;

        if bindings.is_empty() {
            state.axis_bindings.remove(&source);
        }

        if removed {
            debug!(target: "input_system", "Unbound axis '{}' from '{}'", map_name, source_name);
        }
        removed
    }

    /// Removes exactly the `(source_name, map_name)` button binding.
    ///
    /// Returns `false` if that pair was not bound.
    pub fn unbind_button(&self, map_name: &str, source_name: &str) -> bool {
        let mapping = MapHandle::from_name(map_name);
        let source = SourceHandle::from_name(source_name);
        let mut state = lock(&self.state);

        let Some(mappings) = state.button_bindings.get_mut(&source) else {
            return false;
        };

        let before = mappings.len();
        mappings.retain(|&m| m != mapping);
        let removed = mappings.len() != before;

        if mappings.is_empty() {
            state.button_bindings.remove(&source);
        }

        if removed {
            debug!(target: "input_system", "Unbound button '{}' from '{}'", map_name, source_name);
        }
        removed
    }

    //--- Queries ----------------------------------------------------------

    /// Latest resolved value of an axis mapping, `0.0` if none yet.
    pub fn get_axis(&self, map_name: &str) -> f32 {
        let mapping = MapHandle::from_name(map_name);
        let value = lock(&self.state).axis_values.get(&mapping).copied().unwrap_or(0.0);
        trace!(target: "input_system", "get_axis('{}') = {}", map_name, value);
        value
    }

    /// Latest resolved state of a button mapping, `false` if none yet.
    pub fn get_button(&self, map_name: &str) -> bool {
        let mapping = MapHandle::from_name(map_name);
        lock(&self.state).button_values.get(&mapping).copied().unwrap_or(false)
    }

    /// Like [`get_axis`](Self::get_axis), but fails for a mapping no axis
    /// binding targets.
    ///
    /// # Errors
    ///
    /// [`InputError::UnboundMapping`] if `map_name` has no axis binding.
    pub fn try_axis(&self, map_name: &str) -> InputResult<f32> {
        let mapping = MapHandle::from_name(map_name);
        let state = lock(&self.state);

        if !state.axis_targets(mapping) {
            return Err(InputError::UnboundMapping(map_name.to_owned()));
        }
        Ok(state.axis_values.get(&mapping).copied().unwrap_or(0.0))
    }

    /// Like [`get_button`](Self::get_button), but fails for a mapping no
    /// button binding targets.
    ///
    /// # Errors
    ///
    /// [`InputError::UnboundMapping`] if `map_name` has no button binding.
    pub fn try_button(&self, map_name: &str) -> InputResult<bool> {
        let mapping = MapHandle::from_name(map_name);
        let state = lock(&self.state);

        if !state.button_targets(mapping) {
            return Err(InputError::UnboundMapping(map_name.to_owned()));
        }
        Ok(state.button_values.get(&mapping).copied().unwrap_or(false))
    }

    //--- Introspection ----------------------------------------------------

    /// Name a mapping handle was bound under, if any.
    pub fn mapping_name(&self, mapping: MapHandle) -> Option<String> {
        lock(&self.state).maps.name(mapping).ok().map(str::to_owned)
    }

    pub fn has_axis_binding(&self, map_name: &str, source_name: &str) -> bool {
        let mapping = MapHandle::from_name(map_name);
        let source = SourceHandle::from_name(source_name);
        lock(&self.state)
            .axis_bindings
            .get(&source)
            .is_some_and(|bindings| bindings.iter().any(|b| b.mapping == mapping))
    }

    pub fn has_button_binding(&self, map_name: &str, source_name: &str) -> bool {
        let mapping = MapHandle::from_name(map_name);
        let source = SourceHandle::from_name(source_name);
        lock(&self.state)
            .button_bindings
            .get(&source)
            .is_some_and(|mappings| mappings.contains(&mapping))
    }
}

impl Default for InputSystem {
    fn default() -> Self {
        Self::new()
    }
}

//=== Debug Trait =========================================================

impl fmt::Debug for InputSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);

        f.debug_struct("InputSystem")
            .field("listener", &self.listener)
            .field("axis_sources", &state.axis_bindings.len())
            .field("button_sources", &state.button_bindings.len())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
