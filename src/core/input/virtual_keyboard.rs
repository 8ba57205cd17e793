//=========================================================================
// Virtual Keyboard
//=========================================================================
//
// On-screen keyboard consulted while dispatching events. While visible it
// may swallow key events and touches that land on it.
//
// Architecture:
//   process_events → is_visible → input_ignore_target → is_point_on_keyboard
//
//=========================================================================

//=== External Dependencies ===============================================

use bitflags::bitflags;
use glam::Vec2;

//=== InputIgnoreTarget ===================================================

bitflags! {
    /// Event classes suppressed while the virtual keyboard is visible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InputIgnoreTarget: u8 {
        /// Touch down/move events landing on the keyboard area.
        const TOUCH = 1 << 0;
        /// Key state changes, wherever they come from.
        const KEY = 1 << 1;
        const ALL = Self::TOUCH.bits() | Self::KEY.bits();
    }
}

impl InputIgnoreTarget {
    /// Nothing is ignored.
    pub const NONE: Self = Self::empty();
}

//=== VirtualKeyboard =====================================================

/// Modal on-screen keyboard consulted while dispatching events.
pub trait VirtualKeyboard: Send + Sync {
    fn is_visible(&self) -> bool;

    /// Which event classes to swallow while visible.
    fn input_ignore_target(&self) -> InputIgnoreTarget;

    /// Hit test in screen space.
    fn is_point_on_keyboard(&self, point: Vec2) -> bool;
}

//=========================================================================
// Unit Tests
//=========================================================================
