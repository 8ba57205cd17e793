//=========================================================================
// Input Events
//
// Defines the representation of one raw input occurrence as it travels
// from a device, through the manager's queue, to the listeners.
//
// Responsibilities:
// - Represent every event kind as its own variant with its own fields
// - Expose the few cross-cutting accessors dispatch needs (kind, position)
// - Provide `EventBuffer`, the push surface handed to devices while polling
//
// Event Flow:
// ```text
// InputDevice::poll()
//         ↓
//    EventBuffer (this module, worker-local)
//         ↓
//    InputManager queue (validated, ordered)
//         ↓
//    Listeners (priority order) → InputSystem bindings
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use glam::Vec2;

//=== Internal Dependencies ===============================================

use super::handle::{AxisHandle, KeyHandle};

//=== InputEvent ==========================================================

/// One input occurrence.
///
/// Each variant carries exactly the data of its kind, so reading a field
/// that belongs to another kind cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Absolute cursor position in screen space.
    MousePosition { position: Vec2 },

    /// A continuous device axis changed value.
    AxisChange { axis: AxisHandle, value: f32 },

    /// A key or button changed state (`pressed == true` means down).
    KeyStateChange { key: KeyHandle, pressed: bool },

    /// Text input produced by the platform (already layout-resolved).
    InputChar { ch: char },

    /// A finger touched the screen.
    TouchDown { finger: i32, position: Vec2 },

    /// A touching finger moved.
    TouchMove { finger: i32, position: Vec2 },

    /// A finger left the screen.
    TouchUp { finger: i32, position: Vec2 },
}

/// Fieldless discriminant of [`InputEvent`], handy for logging and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEventKind {
    MousePosition,
    AxisChange,
    KeyStateChange,
    InputChar,
    TouchDown,
    TouchMove,
    TouchUp,
}

impl InputEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> InputEventKind {
        match self {
            Self::MousePosition { .. } => InputEventKind::MousePosition,
            Self::AxisChange { .. } => InputEventKind::AxisChange,
            Self::KeyStateChange { .. } => InputEventKind::KeyStateChange,
            Self::InputChar { .. } => InputEventKind::InputChar,
            Self::TouchDown { .. } => InputEventKind::TouchDown,
            Self::TouchMove { .. } => InputEventKind::TouchMove,
            Self::TouchUp { .. } => InputEventKind::TouchUp,
        }
    }

    /// Screen position carried by pointer and touch events.
    pub fn position(&self) -> Option<Vec2> {
        match *self {
            Self::MousePosition { position }
            | Self::TouchDown { position, .. }
            | Self::TouchMove { position, .. }
            | Self::TouchUp { position, .. } => Some(position),
            _ => None,
        }
    }
}

//=== EventBuffer =========================================================

/// Append-only event list filled by devices during one poll iteration.
///
/// The polling worker hands one buffer to every device, then moves its
/// contents into the manager's queue in a single locked step. Key handles
/// are validated at that point, not here.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<InputEvent>,
}

impl EventBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Creates an empty buffer with room for `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    //--- Push API ---------------------------------------------------------

    pub fn push_key_state_change(&mut self, key: KeyHandle, pressed: bool) {
        self.push(InputEvent::KeyStateChange { key, pressed });
    }

    pub fn push_input_char(&mut self, ch: char) {
        self.push(InputEvent::InputChar { ch });
    }

    pub fn push_axis_change(&mut self, axis: AxisHandle, value: f32) {
        self.push(InputEvent::AxisChange { axis, value });
    }

    pub fn push_mouse_position(&mut self, position: Vec2) {
        self.push(InputEvent::MousePosition { position });
    }

    pub fn push_touch_down(&mut self, finger: i32, position: Vec2) {
        self.push(InputEvent::TouchDown { finger, position });
    }

    pub fn push_touch_move(&mut self, finger: i32, position: Vec2) {
        self.push(InputEvent::TouchMove { finger, position });
    }

    pub fn push_touch_up(&mut self, finger: i32, position: Vec2) {
        self.push(InputEvent::TouchUp { finger, position });
    }

    /// Appends an already constructed event.
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    //--- Access -----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in push order.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Removes and yields all events in push order, keeping capacity.
    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, InputEvent> {
        self.events.drain(..)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
