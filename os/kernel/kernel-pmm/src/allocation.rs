//! # Page Allocation
//!
//! The four calls the rest of the kernel uses to get and return frames.
//! Every one of them halts if the direct map is not installed yet.
//!
//! Page-table roots have their own pool. Taking a root falls back to the
//! general pool when the page-table pool is empty, but releasing a root
//! always returns it to the page-table pool.

use crate::direct_map::ZERO_FRAME;
use crate::{AllocError, FreeList, MappedFrame, PhysicalMemory};
use kernel_memory_addresses::PhysicalAddress;

impl PhysicalMemory<'_> {
    /// A general-pool page with every byte cleared. Its count is zero.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if the general pool is empty.
    pub fn new_zeroed_page(&self) -> Result<MappedFrame, AllocError> {
        let frame = self.allocate(FreeList::General)?;
        // SAFETY: the frame was just unlinked and has no owner yet.
        unsafe { frame.bytes_mut() }.0.copy_from_slice(&ZERO_FRAME.0);
        Ok(frame)
    }

    /// A general-pool page with unspecified contents. Its count is zero.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if the general pool is empty.
    pub fn new_raw_page(&self) -> Result<MappedFrame, AllocError> {
        self.allocate(FreeList::General)
    }

    /// A frame for a new top-level page table.
    ///
    /// Reuses a released root if one is cached, otherwise takes a zeroed
    /// page from the general pool. A reused root is handed out exactly as
    /// it was released.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if both pools are empty.
    pub fn new_page_table_root(&self) -> Result<MappedFrame, AllocError> {
        if let Some(frame) = self.take(FreeList::PageTables) {
            log::trace!("reusing page-table root {}", frame.page());
            return Ok(frame);
        }
        log::trace!("page-table pool empty, taking a zeroed page");
        self.new_zeroed_page()
    }

    /// Drop a reference on a page-table root.
    ///
    /// On the last reference the frame goes to the page-table pool rather
    /// than the general one. Returns whether that happened.
    #[must_use]
    pub fn release_page_table_root(&self, pa: PhysicalAddress) -> bool {
        self.ensure_initialized();
        let (index, last) = self.drop_ref(pa);
        if last {
            log::trace!("caching page-table root {}", self.page_of(index));
            self.free(FreeList::PageTables, index);
        }
        last
    }
}
