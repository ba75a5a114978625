//! # Page-Table Accounting
//!
//! Counts the live user mappings below a page-table root.
//!
//! Every entry with both `present` and `user_access` set counts as one. At
//! levels above the last, such an entry is also a pointer to a child table,
//! whose count is added. Depth `n` means the table at hand is `n` levels
//! above the pages; at depth 0 there is no table left to read, so the
//! address bits of the last level's entries are never followed.
//!
//! ```text
//! depth 4: PML4   ─┐ +1 per present+user entry
//! depth 3: PDPT    ├─ recurse into children (unless PS=1)
//! depth 2: PD      │
//! depth 1: PT     ─┘ +1 per present+user entry, no recursion
//! ```
//!
//! A `large_page` entry above the last level maps a 2 MiB / 1 GiB page
//! directly. It is counted like any other leaf, but not followed.

use crate::{PageTable, PhysMapper};
use kernel_memory_addresses::{PhysicalPage, Size4K};

/// Count present+user entries in the tree rooted at `root`, `depth` levels deep.
///
/// Takes no lock. Callers that need a consistent snapshot must keep the tree
/// from changing for the duration of the walk.
///
/// # Safety
/// - `root`, and every child reachable through present+user entries above
///   the last level, must be a frame holding a page table that `mapper` can
///   reach.
/// - No other context may write to those tables during the walk.
#[must_use]
pub unsafe fn count_user_entries<M: PhysMapper>(
    mapper: &M,
    root: PhysicalPage<Size4K>,
    depth: u8,
) -> usize {
    if depth == 0 {
        return 0;
    }

    // SAFETY: guaranteed by the caller.
    let table: &PageTable = unsafe { mapper.phys_to_ref(root.base()) };

    let mut count = 0;
    for entry in table.iter().filter(crate::PageEntryBits::is_present_user) {
        count += 1;
        if entry.large_page() && depth > 1 {
            log::trace!("not descending into large page at {}", entry.address());
            continue;
        }
        // SAFETY: non-leaf present entries point at child tables (caller contract).
        count += unsafe { count_user_entries(mapper, entry.frame(), depth - 1) };
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageEntryBits;
    use kernel_memory_addresses::PhysicalAddress;
    use std::cell::UnsafeCell;
    use std::ptr::NonNull;

    /// Tables indexed by frame number; physical address = index * 4096.
    struct Tables(Vec<UnsafeCell<PageTable>>);

    impl Tables {
        fn new(n: usize) -> Self {
            Self((0..n).map(|_| UnsafeCell::new(PageTable::zeroed())).collect())
        }

        fn set(&self, table: u64, index: usize, entry: PageEntryBits) {
            // SAFETY: single-threaded test, no outstanding borrows.
            unsafe { (*self.0[table as usize].get()).set_entry(index, entry) }
        }
    }

    impl PhysMapper for Tables {
        fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> NonNull<T> {
            NonNull::new(self.0[(pa.as_u64() >> 12) as usize].get().cast()).unwrap()
        }
    }

    fn page(frame: u64) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(PhysicalAddress::new(frame << 12))
    }

    fn user_to(frame: u64) -> PageEntryBits {
        PageEntryBits::user_rw().with_address(PhysicalAddress::new(frame << 12))
    }

    #[test]
    fn depth_zero_reads_nothing() {
        let t = Tables::new(1);
        t.set(0, 0, user_to(0));
        assert_eq!(unsafe { count_user_entries(&t, page(0), 0) }, 0);
    }

    #[test]
    fn leaf_level_does_not_follow_addresses() {
        let t = Tables::new(2);
        // Leaf entries point at frame 1, which would add more if followed.
        for i in 0..5 {
            t.set(0, i, user_to(1));
        }
        t.set(1, 0, user_to(1));
        t.set(0, 9, PageEntryBits::kernel_rw_global().with_address(PhysicalAddress::new(0x1000)));
        assert_eq!(unsafe { count_user_entries(&t, page(0), 1) }, 5);
    }

    #[test]
    fn child_tables_are_added() {
        let t = Tables::new(3);
        t.set(0, 0, user_to(1));
        t.set(0, 1, user_to(2));
        t.set(0, 2, user_to(2));
        for i in 0..4 {
            t.set(1, i, user_to(2));
        }
        // Frame 2 is empty, so the three pointers to it add nothing.
        assert_eq!(unsafe { count_user_entries(&t, page(0), 2) }, 3 + 4);
    }

    #[test]
    fn large_pages_are_counted_but_not_followed() {
        let t = Tables::new(2);
        t.set(0, 0, user_to(1).with_large_page(true));
        t.set(1, 0, user_to(1));
        assert_eq!(unsafe { count_user_entries(&t, page(0), 3) }, 1);
    }

    #[test]
    fn four_level_chain() {
        let t = Tables::new(4);
        t.set(0, 0, user_to(1));
        t.set(1, 0, user_to(2));
        t.set(2, 0, user_to(3));
        t.set(3, 0, user_to(0));
        t.set(3, 1, user_to(0));
        assert_eq!(unsafe { count_user_entries(&t, page(0), 4) }, 1 + 1 + 1 + 2);
    }
}
