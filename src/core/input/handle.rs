//=========================================================================
// Input Handles
//=========================================================================
//
// Stable 32-bit identifiers derived from human-readable names.
//
// Architecture:
//   "Key_W" → hash_name() → KeyHandle(u32)
//   "MoveForward" → hash_name() → MapHandle(u32)
//
// The hash is deterministic and `const`, so handles can be computed at
// compile time. Collisions are NOT detected: two names hashing to the
// same value are the same handle.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::hash::Hash;

use xxhash_rust::const_xxh32::xxh32;

//=== Hashing =============================================================

const NAME_SEED: u32 = 0;

/// Hashes a name into a 32-bit handle value (xxHash32, seed 0).
pub const fn hash_name(name: &str) -> u32 {
    xxh32(name.as_bytes(), NAME_SEED)
}

//=== Handle Trait ========================================================

/// Common behaviour of every name-derived handle type.
///
/// Lets [`HandleRegistry`](super::registry::HandleRegistry) stay generic
/// over keys, axes and mappings.
pub trait Handle: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Derives the handle for `name`.
    fn from_name(name: &str) -> Self;

    /// Returns the raw 32-bit value.
    fn raw(self) -> u32;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Derives the handle for `name` (usable in `const` context).
            pub const fn from_name(name: &str) -> Self {
                Self(hash_name(name))
            }

            /// Wraps an already hashed value.
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw 32-bit value.
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl Handle for $name {
            fn from_name(name: &str) -> Self {
                $name::from_name(name)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(0x{:08x})"), self.0)
            }
        }
    };
}

//=== Handle Types ========================================================

define_handle!(
    /// Identifies a discrete key or button (`"Key_Space"`, `"Mouse_Left"`).
    KeyHandle
);

define_handle!(
    /// Identifies a continuous device axis (`"Pad_LeftStickX"`).
    AxisHandle
);

define_handle!(
    /// Identifies an application-facing mapping (`"MoveForward"`, `"Jump"`).
    MapHandle
);

define_handle!(
    /// Raw side of a binding: either a key or an axis.
    ///
    /// Keys and axes share one hash space, so a source name resolves to the
    /// same value whichever event kind later carries it.
    SourceHandle
);

impl From<KeyHandle> for SourceHandle {
    fn from(key: KeyHandle) -> Self {
        Self(key.raw())
    }
}

impl From<AxisHandle> for SourceHandle {
    fn from(axis: AxisHandle) -> Self {
        Self(axis.raw())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
