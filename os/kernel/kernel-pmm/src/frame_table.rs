//! # Frame Table
//!
//! One [`FrameDescriptor`] per managed frame, indexed by
//! `frame number - start frame number`.

use core::fmt;
use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Free-list link value meaning "end of list".
pub(crate) const SENTINEL: u32 = u32::MAX;

/// Metadata for one physical frame.
///
/// `refcount` is mutated lock-free. `next_free` is only meaningful while the
/// frame sits on a free list and is only touched with the free-list lock held;
/// it is atomic so that the table can be shared without `UnsafeCell`.
#[repr(C)]
pub struct FrameDescriptor {
    refcount: AtomicI32,
    next_free: AtomicU32,
}

impl FrameDescriptor {
    /// A frame that is free and will be linked onto the general list.
    #[must_use]
    pub const fn free() -> Self {
        Self::with_refcount(0)
    }

    /// A frame that is already owned (kernel image, frame table, firmware).
    /// It is never linked onto a free list.
    #[must_use]
    pub const fn reserved() -> Self {
        Self::with_refcount(1)
    }

    /// A frame with an explicit starting count.
    #[must_use]
    pub const fn with_refcount(count: i32) -> Self {
        Self {
            refcount: AtomicI32::new(count),
            next_free: AtomicU32::new(SENTINEL),
        }
    }

    #[inline]
    pub(crate) fn count(&self) -> i32 {
        self.refcount.load(Ordering::Relaxed)
    }

    /// Returns the count after the increment.
    #[inline]
    pub(crate) fn increment(&self) -> i32 {
        self.refcount.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Returns the count after the decrement.
    #[inline]
    pub(crate) fn decrement(&self) -> i32 {
        self.refcount.fetch_sub(1, Ordering::Release).wrapping_sub(1)
    }

    #[inline]
    pub(crate) fn next_free(&self) -> u32 {
        self.next_free.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_next_free(&self, next: u32) {
        self.next_free.store(next, Ordering::Relaxed);
    }
}

impl Default for FrameDescriptor {
    fn default() -> Self {
        Self::free()
    }
}

impl fmt::Debug for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FrameDescriptor");
        s.field("refcount", &self.count());
        match self.next_free() {
            SENTINEL => s.field("next_free", &format_args!("-")),
            next => s.field("next_free", &next),
        };
        s.finish()
    }
}
