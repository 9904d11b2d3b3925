//! Generation-tagged handles into pooled storage.
//!
//! Every long-lived cross-reference in the runtime — object to object,
//! object to component, pending-destruction queues — is a `Handle`, never a
//! raw pointer or bare index.  A handle packs a slot index and a generation
//! counter into a single `u32`; a lookup succeeds only when the slot is
//! occupied *and* the stored generation matches bit-for-bit, so references
//! to recycled slots resolve to `None` instead of aliasing the new tenant.

use std::fmt;

/// Bits reserved for the slot index (about one million slots per pool).
pub const INDEX_BITS: u32 = 20;
/// Bits reserved for the wrapping generation counter.
pub const GENERATION_BITS: u32 = 12;

const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// Hard cap on slots per pool.  Slot index `INDEX_MASK` is reserved so the
/// all-ones [`Handle::NONE`] bit pattern can never be handed out.
pub const MAX_SLOTS: u32 = INDEX_MASK;

/// Opaque reference into a pooled store.
///
/// `Handle` says nothing about *which* pool it indexes; each pool validates
/// handles against its own slots, so a handle from one world (or one
/// component type) simply fails to resolve anywhere else.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The null handle.  Occupies the all-ones bit pattern; pools never
    /// hand out slot index `INDEX_MASK`, so `NONE` can never collide with
    /// a live handle.
    pub const NONE: Handle = Handle(u32::MAX);

    /// Pack a slot index and generation.  Both values must fit their bit
    /// widths; the index must stay below the reserved sentinel slot.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        debug_assert!(index < INDEX_MASK, "slot index out of range: {index}");
        debug_assert!(generation <= GENERATION_MASK);
        Handle((generation << INDEX_BITS) | index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> INDEX_BITS) & GENERATION_MASK
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == Handle::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Handle::NONE
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::NONE
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Handle(NONE)")
        } else {
            write!(f, "Handle({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Advance a generation counter, wrapping inside its bit width.
#[inline]
pub fn next_generation(generation: u32) -> u32 {
    (generation + 1) & GENERATION_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrip() {
        let h = Handle::new(1234, 56);
        assert_eq!(h.index(), 1234);
        assert_eq!(h.generation(), 56);
        assert!(h.is_some());
    }

    #[test]
    fn none_is_distinct() {
        assert!(Handle::NONE.is_none());
        assert_eq!(Handle::default(), Handle::NONE);
        // The highest addressable slot with the highest generation must not
        // equal NONE — index INDEX_MASK itself is reserved.
        let h = Handle::new(INDEX_MASK - 1, GENERATION_MASK);
        assert_ne!(h, Handle::NONE);
    }

    #[test]
    fn generation_wraps() {
        assert_eq!(next_generation(GENERATION_MASK), 0);
        assert_eq!(next_generation(0), 1);
    }

    #[test]
    fn same_slot_different_generation_differs() {
        let a = Handle::new(7, 1);
        let b = Handle::new(7, 2);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
    }
}
