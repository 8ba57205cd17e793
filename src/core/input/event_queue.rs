//=========================================================================
// Event Queue
//=========================================================================
//
// The event domain of the input manager: pending events, the listener
// list and the optional virtual keyboard, all guarded by one mutex.
//
// Architecture:
//   push (any thread) → events: Vec<InputEvent>
//                              ↓
//   dispatch (logic tick) → virtual keyboard filter → listeners (priority)
//                              ↓
//                         events.clear()
//
// Pattern: push → dispatch (one consumer) → clear → repeat
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

//=== Internal Dependencies ===============================================

use super::virtual_keyboard::{InputIgnoreTarget, VirtualKeyboard};
use super::event::{InputEvent, InputEventKind};

//=== Listener Types ======================================================

/// Callback offered each dispatched event; returns `true` to consume it.
pub type InputListener = Box<dyn FnMut(&InputEvent) -> bool + Send>;

/// Token returned by `add_input_listener`, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

//=== EventQueue ==========================================================

/// Pending events plus everything dispatch needs, behind the event mutex.
pub(crate) struct EventQueue {
    events: Vec<InputEvent>,
    listeners: Vec<(ListenerId, InputListener)>,
    virtual_keyboard: Option<Arc<dyn VirtualKeyboard>>,
    next_listener: u64,
}

impl EventQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            listeners: Vec::new(),
            virtual_keyboard: None,
            next_listener: 0,
        }
    }

    //--- Events -----------------------------------------------------------

    pub(crate) fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    //--- Listeners --------------------------------------------------------

    /// Inserts at the front (high priority) or the back of the list.
    pub(crate) fn add_listener(&mut self, listener: InputListener, high_priority: bool) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;

        if high_priority {
            self.listeners.insert(0, (id, listener));
        } else {
            self.listeners.push((id, listener));
        }

        id
    }

    /// Removes the listener registered under `id`.
    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn set_virtual_keyboard(&mut self, keyboard: Option<Arc<dyn VirtualKeyboard>>) {
        self.virtual_keyboard = keyboard;
    }

    /// Drops pending events and listeners (manager shutdown).
    pub(crate) fn reset(&mut self) {
        self.events.clear();
        self.listeners.clear();
    }

    //--- Dispatch ---------------------------------------------------------

    /// Offers every pending event to the listeners, then clears the queue.
    ///
    /// Events are visited in push order. For each event, listeners are
    /// visited front to back until one returns `true`.
    ///
    /// The batch is taken out of the queue before the first listener runs,
    /// so a panicking listener loses the rest of the batch instead of
    /// replaying it on the next call.
    pub(crate) fn dispatch(&mut self) {
        let mut batch = std::mem::take(&mut self.events);

        let Self {
            listeners,
            virtual_keyboard,
            ..
        } = &mut *self;

        for event in batch.iter() {
            if let Some(keyboard) = virtual_keyboard.as_deref() {
                if is_suppressed(keyboard, event) {
                    trace!(
                        target: "input_manager",
                        "Virtual keyboard is shown; ignoring {:?} event",
                        event.kind()
                    );
                    continue;
                }
            }

            for (id, listener) in listeners.iter_mut() {
                if listener(event) {
                    debug!(
                        target: "input_manager",
                        "Listener {:?} handled {:?}; dismissing event",
                        id,
                        event.kind()
                    );
                    break;
                }
            }
        }

        // Hand the allocation back; nothing can push while we hold `&mut self`.
        batch.clear();
        self.events = batch;
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listener_ids: Vec<_> = self.listeners.iter().map(|(id, _)| *id).collect();

        f.debug_struct("EventQueue")
            .field("pending", &self.events.len())
            .field("listeners", &listener_ids)
            .field("virtual_keyboard", &self.virtual_keyboard.is_some())
            .finish()
    }
}

//=== Virtual Keyboard Filter =============================================

/// Decides whether a visible virtual keyboard swallows `event`.
///
/// Key events are dropped when the KEY bit is set. Touch down/move events
/// are dropped when the TOUCH bit is set and they land on the keyboard.
fn is_suppressed(keyboard: &dyn VirtualKeyboard, event: &InputEvent) -> bool {
    if !keyboard.is_visible() {
        return false;
    }

    let ignore = keyboard.input_ignore_target();

    match event.kind() {
        InputEventKind::KeyStateChange => ignore.contains(InputIgnoreTarget::KEY),
        InputEventKind::TouchDown | InputEventKind::TouchMove => {
            ignore.contains(InputIgnoreTarget::TOUCH)
                && event
                    .position()
                    .is_some_and(|point| keyboard.is_point_on_keyboard(point))
        }
        _ => false,
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
