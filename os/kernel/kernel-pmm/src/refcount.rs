//! # Reference Counting
//!
//! Per-frame counts are plain atomics and never take the free-list lock,
//! except on the transition to zero, where the frame goes back to a list.
//!
//! Owners take one reference per mapping they install and drop one per
//! mapping they remove. There is no reverse tracking of who holds what.

use crate::error::{InvariantViolation, fatal};
use crate::{FreeList, PhysicalMemory};
use core::sync::atomic::{Ordering, fence};
use kernel_memory_addresses::PhysicalAddress;

impl PhysicalMemory<'_> {
    /// Take a reference and return the new count, without checking it.
    #[must_use]
    pub fn increment_and_get(&self, pa: PhysicalAddress) -> i32 {
        self.descriptor(self.index_of(pa)).increment()
    }

    /// Take a reference on the frame containing `pa`.
    ///
    /// Halts if the count is not positive afterwards.
    pub fn increment(&self, pa: PhysicalAddress) {
        let index = self.index_of(pa);
        let count = self.descriptor(index).increment();
        if count <= 0 {
            fatal(InvariantViolation::RefCountNotPositive {
                index,
                page: self.page_of(index),
                count,
            });
        }
    }

    /// Drop a reference on the frame containing `pa`.
    ///
    /// Returns `true` if this was the last one; the frame is then back on
    /// the general free list. Halts if the count drops below zero.
    #[must_use]
    pub fn decrement(&self, pa: PhysicalAddress) -> bool {
        let (index, last) = self.drop_ref(pa);
        if last {
            self.free(FreeList::General, index);
        }
        last
    }

    /// Current count of the frame containing `pa`.
    #[must_use]
    pub fn ref_count(&self, pa: PhysicalAddress) -> i32 {
        self.descriptor(self.index_of(pa)).count()
    }

    /// Decrement without returning the frame anywhere.
    ///
    /// Returns the frame-table index and whether the count reached zero.
    pub(crate) fn drop_ref(&self, pa: PhysicalAddress) -> (u32, bool) {
        let index = self.index_of(pa);
        let count = self.descriptor(index).decrement();
        if count < 0 {
            fatal(InvariantViolation::RefCountUnderflow {
                index,
                page: self.page_of(index),
                count,
            });
        }
        if count == 0 {
            // Pairs with the Release decrements of earlier owners: their
            // writes to the frame are visible before it is handed out again.
            fence(Ordering::Acquire);
            return (index, true);
        }
        (index, false)
    }
}

#[cfg(test)]
mod tests {
    use crate::{FrameDescriptor, PhysicalMemory};
    use kernel_memory_addresses::{FrameNumber, PhysicalAddress};

    #[test]
    fn counts_without_direct_map() {
        let table = [FrameDescriptor::free(), FrameDescriptor::free()];
        let pmm = PhysicalMemory::new(&table, FrameNumber::new(1));
        let pa = PhysicalAddress::new(0x2000);

        assert_eq!(pmm.increment_and_get(pa), 1);
        pmm.increment(pa);
        assert_eq!(pmm.ref_count(pa), 2);
        assert_eq!(pmm.drop_ref(pa), (1, false));
        assert_eq!(pmm.drop_ref(pa), (1, true));
        assert_eq!(pmm.ref_count(PhysicalAddress::new(0x1000)), 0);
    }

    #[test]
    #[should_panic(expected = "refcount underflow: frame 0")]
    fn drop_below_zero_is_fatal() {
        let table = [FrameDescriptor::free()];
        let pmm = PhysicalMemory::new(&table, FrameNumber::new(0));
        let _ = pmm.drop_ref(PhysicalAddress::zero());
    }
}
