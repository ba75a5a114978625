//! # Diagnostics
//!
//! Free-list lengths and live user mappings, read while holding the
//! free-list lock so the numbers describe one moment.

use crate::{FreeList, PhysicalMemory};
use core::fmt;
use kernel_info::memory::PAGE_TABLE_LEVELS;
use kernel_memory_addresses::{PhysicalPage, Size4K};
use kernel_vmem::accounting;

/// Snapshot produced by [`PhysicalMemory::page_counts`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PageCounts {
    /// Frames on the general free list.
    pub free_frames: usize,
    /// Present+user entries still reachable from roots cached on the
    /// page-table free list. Anything but zero means a root was released
    /// with live mappings.
    pub page_table_entries: usize,
}

impl fmt::Display for PageCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} free frames, {} live page-table entries",
            self.free_frames, self.page_table_entries
        )
    }
}

impl PhysicalMemory<'_> {
    /// Count free frames and leftover user entries in cached page-table
    /// roots.
    ///
    /// Halts before initialization.
    ///
    /// # Safety
    /// Every root cached on the page-table pool, and every child table its
    /// present+user entries point to, must still hold a well-formed page
    /// table inside the direct map.
    #[must_use]
    pub unsafe fn page_counts(&self) -> PageCounts {
        let direct_map = self.direct_map();
        let lists = self.lists.lock();

        let free_frames = lists.iter(FreeList::General, self.frames).count();
        let page_table_entries = lists
            .iter(FreeList::PageTables, self.frames)
            .map(|index| {
                // SAFETY: guaranteed by the caller; the lock keeps the pool fixed.
                unsafe {
                    accounting::count_user_entries(
                        direct_map,
                        self.page_of(index),
                        PAGE_TABLE_LEVELS,
                    )
                }
            })
            .sum();

        PageCounts {
            free_frames,
            page_table_entries,
        }
    }

    /// Count present+user entries below `root`, `depth` levels deep, with
    /// the free-list lock held.
    ///
    /// Halts before initialization.
    ///
    /// # Safety
    /// `root` and every child table reachable through present+user entries
    /// above the last level must be page tables inside the direct map that
    /// nothing writes to during the walk.
    #[must_use]
    pub unsafe fn count_user_entries(&self, root: PhysicalPage<Size4K>, depth: u8) -> usize {
        let direct_map = self.direct_map();
        let _lists = self.lists.lock();
        // SAFETY: forwarded to the caller.
        unsafe { accounting::count_user_entries(direct_map, root, depth) }
    }

    /// Length of `list`.
    #[must_use]
    pub fn free_count(&self, list: FreeList) -> usize {
        self.lists.lock().iter(list, self.frames).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let counts = PageCounts {
            free_frames: 12,
            page_table_entries: 0,
        };
        assert_eq!(counts.to_string(), "12 free frames, 0 live page-table entries");
    }
}
