//=========================================================================
// Handle Registry
//=========================================================================
//
// Interns human-readable names into stable handles and remembers the
// name behind each handle.
//
// Architecture:
//   add_name("Key_W") → hash → HashMap<KeyHandle, String> → name(handle)
//
// Registries are filled during setup and then frozen (usually behind an
// `Arc`). They are not internally synchronized: mutation requires
// `&mut self`, so the borrow checker enforces "register before sharing".
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

//=== Internal Dependencies ===============================================

use super::handle::{AxisHandle, Handle, KeyHandle};
use crate::core::error::{InputError, InputResult};

//=== HandleRegistry ======================================================

/// Mapping from handle to the name it was derived from.
#[derive(Debug, Clone)]
pub struct HandleRegistry<H: Handle> {
    names: HashMap<H, String>,
}

/// Registry of key handles validated by the input manager.
pub type KeyRegistry = HandleRegistry<KeyHandle>;

/// Registry of device axis handles.
pub type AxisRegistry = HandleRegistry<AxisHandle>;

impl<H: Handle> HandleRegistry<H> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Interns `name` and returns its handle.
    ///
    /// Idempotent: adding the same name again returns the same handle and
    /// rewrites the stored name. A colliding name silently replaces the
    /// stored one.
    pub fn add_name(&mut self, name: &str) -> H {
        let handle = H::from_name(name);
        self.names.insert(handle, name.to_owned());
        handle
    }

    //--- Queries ----------------------------------------------------------

    /// Returns `true` if the handle was registered.
    pub fn has_handle(&self, handle: H) -> bool {
        self.names.contains_key(&handle)
    }

    /// Returns the name registered for `handle`.
    ///
    /// # Errors
    ///
    /// [`InputError::HandleNotFound`] if the handle was never added.
    pub fn name(&self, handle: H) -> InputResult<&str> {
        self.names
            .get(&handle)
            .map(String::as_str)
            .ok_or(InputError::HandleNotFound(handle.raw()))
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over `(handle, name)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &str)> {
        self.names.iter().map(|(h, n)| (*h, n.as_str()))
    }
}

impl<H: Handle> Default for HandleRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Default Key Set =====================================================

const MODIFIER_KEYS: &[&str] = &[
    "Key_LeftCtrl", "Key_LeftShift", "Key_LeftAlt", "Key_LeftSuper",
    "Key_RightCtrl", "Key_RightShift", "Key_RightAlt", "Key_RightSuper",
    "Key_Menu",
];

const PUNCTUATION_KEYS: &[&str] = &[
    "Key_Apostrophe", "Key_Comma", "Key_Minus", "Key_Period", "Key_Slash",
    "Key_Semicolon", "Key_Equal", "Key_LeftBracket", "Key_Backslash",
    "Key_RightBracket", "Key_GraveAccent",
];

const SYSTEM_KEYS: &[&str] = &[
    "Key_CapsLock", "Key_ScrollLock", "Key_NumLock", "Key_PrintScreen", "Key_Pause",
];

const NAVIGATION_KEYS: &[&str] = &[
    "Key_Insert", "Key_Delete", "Key_Home", "Key_End", "Key_PageUp", "Key_PageDown",
    "Key_ArrowUp", "Key_ArrowDown", "Key_ArrowLeft", "Key_ArrowRight",
];

const KEYPAD_KEYS: &[&str] = &[
    "Key_KeypadDecimal", "Key_KeypadDivide", "Key_KeypadMultiply",
    "Key_KeypadSubtract", "Key_KeypadAdd", "Key_KeypadEnter", "Key_KeypadEqual",
];

const SPECIAL_KEYS: &[&str] = &[
    "Key_Space", "Key_Enter", "Key_Escape", "Key_Backspace", "Key_Tab",
];

impl HandleRegistry<KeyHandle> {
    /// Creates a key registry pre-filled with the standard desktop key set.
    pub fn with_default_keys() -> Self {
        let mut registry = Self::new();
        registry.register_default_keys();
        registry
    }

    /// Registers mouse buttons, letters, digits, F1-F24, modifiers,
    /// punctuation, lock, navigation, keypad and special keys.
    pub fn register_default_keys(&mut self) {
        for name in ["Mouse_Left", "Mouse_Right", "Mouse_Middle"] {
            self.add_name(name);
        }

        for c in ('A'..='Z').chain('0'..='9') {
            self.add_name(&format!("Key_{c}"));
        }

        for i in 1..=24 {
            self.add_name(&format!("Key_F{i}"));
        }

        for i in 0..=9 {
            self.add_name(&format!("Key_Keypad{i}"));
        }

        let groups = [
            MODIFIER_KEYS,
            PUNCTUATION_KEYS,
            SYSTEM_KEYS,
            NAVIGATION_KEYS,
            KEYPAD_KEYS,
            SPECIAL_KEYS,
        ];

        for name in groups.into_iter().flatten() {
            self.add_name(name);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
