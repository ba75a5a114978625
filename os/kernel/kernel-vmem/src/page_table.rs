//! # Page Table Frame

use crate::PageEntryBits;
use kernel_info::memory::{FRAME_SIZE, PAGE_TABLE_ENTRIES};

/// One 4 KiB paging structure: 512 entries at any level of the tree.
///
/// The layout is exactly one frame, so a frame handed out by the physical
/// memory manager can be viewed as a `PageTable` through the direct map.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct PageTable {
    entries: [PageEntryBits; PAGE_TABLE_ENTRIES],
}

const _: () = assert!(size_of::<PageTable>() as u64 == FRAME_SIZE);

impl PageTable {
    /// A table with every entry cleared (not present).
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageEntryBits::new(); PAGE_TABLE_ENTRIES],
        }
    }

    #[inline]
    #[must_use]
    pub const fn entry(&self, index: usize) -> PageEntryBits {
        self.entries[index]
    }

    #[inline]
    pub const fn set_entry(&mut self, index: usize, entry: PageEntryBits) {
        self.entries[index] = entry;
    }

    /// Clear every entry.
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageEntryBits::new());
    }

    pub fn iter(&self) -> impl Iterator<Item = PageEntryBits> + '_ {
        self.entries.iter().copied()
    }

    /// Number of entries with both `present` and `user_access` set.
    #[must_use]
    pub fn count_present_user(&self) -> usize {
        self.iter().filter(PageEntryBits::is_present_user).count()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_table_has_no_live_entries() {
        let t = PageTable::zeroed();
        assert!(t.iter().all(|e| e.into_bits() == 0));
        assert_eq!(t.count_present_user(), 0);
    }

    #[test]
    fn counts_only_present_user_entries() {
        let mut t = PageTable::zeroed();
        t.set_entry(0, PageEntryBits::user_rw());
        t.set_entry(1, PageEntryBits::kernel_rw_global());
        t.set_entry(2, PageEntryBits::new().with_user_access(true));
        t.set_entry(511, PageEntryBits::user_rw().with_large_page(true));
        assert_eq!(t.count_present_user(), 2);

        t.zero();
        assert_eq!(t.count_present_user(), 0);
    }
}
