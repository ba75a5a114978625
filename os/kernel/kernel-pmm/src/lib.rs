//! # Physical Memory Manager
//!
//! Tracks every frame of one contiguous physical span, hands frames out,
//! and takes them back through reference counting.
//!
//! ## Pieces
//!
//! | Piece | Where |
//! |-------|-------|
//! | Frame table ([`FrameDescriptor`]) | [`frame_table`] |
//! | Two free lists under one lock ([`FreeList`]) | [`free_list`] |
//! | Atomic reference counts | [`PhysicalMemory::increment`], [`PhysicalMemory::decrement`] |
//! | Direct map ([`DirectMap`], [`MappedFrame`]) | [`direct_map`] |
//! | Page, zeroed page, page-table root | [`PhysicalMemory::new_zeroed_page`] and friends |
//! | Live-entry accounting | [`PhysicalMemory::page_counts`] |
//!
//! ## Lifecycle
//!
//! ```text
//!        new_*_page / allocate                 increment
//!  free ───────────────────────► count 0 ─────────────────► count n > 0
//!   ▲                                                            │
//!   └────────────── decrement to 0 (general list) ◄──────────────┘
//!                   release_page_table_root to 0 (page-table list)
//! ```
//!
//! A freshly allocated frame has a count of zero; the caller takes the first
//! reference once the frame's contents are ready.
//!
//! ## Failures
//!
//! Running out of frames is an ordinary [`AllocError`]. Anything that means
//! the accounting is corrupt (negative counts, frames outside the table,
//! addresses outside the direct map, use before the direct map exists) goes
//! through [`fatal`](error::fatal) and never returns.
//!
//! ```
//! # use kernel_pmm::*;
//! # use kernel_memory_addresses::FrameNumber;
//! let mut ram = vec![FrameBytes::zeroed(); 2];
//! let frames = [FrameDescriptor::free(), FrameDescriptor::free()];
//! let pmm = PhysicalMemory::new(&frames, FrameNumber::new(0));
//! // Physical address 0 is the first buffer frame.
//! pmm.install_direct_map(unsafe { DirectMap::from_ptr(ram.as_mut_ptr().cast()) });
//!
//! let page = pmm.new_zeroed_page().unwrap();
//! pmm.increment(page.phys());
//! assert_eq!(pmm.free_count(FreeList::General), 1);
//! assert!(pmm.decrement(page.phys()));
//! assert_eq!(pmm.free_count(FreeList::General), 2);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod allocation;
mod diagnostics;
pub mod direct_map;
pub mod error;
pub mod frame_table;
pub mod free_list;
mod refcount;

use core::fmt;
use kernel_info::memory::{DIRECT_MAP_SIZE, FRAME_SIZE};
use kernel_memory_addresses::{FrameNumber, PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::{SpinLock, SyncOnceCell};

use crate::error::{InvariantViolation, fatal};
use crate::frame_table::SENTINEL;
use crate::free_list::FreeLists;

pub use crate::diagnostics::PageCounts;
pub use crate::direct_map::{DirectMap, FrameBytes, MappedFrame};
pub use crate::error::AllocError;
pub use crate::frame_table::FrameDescriptor;
pub use crate::free_list::FreeList;

/// The physical memory manager.
///
/// Built once at boot from the frame table the memory-discovery code sized
/// and placed, then shared by reference with every context that needs frames.
pub struct PhysicalMemory<'a> {
    frames: &'a [FrameDescriptor],
    start: FrameNumber,
    lists: SpinLock<FreeLists>,
    direct_map: SyncOnceCell<DirectMap>,
}

impl<'a> PhysicalMemory<'a> {
    /// Adopt a frame table whose first descriptor describes `start`.
    ///
    /// Free descriptors (count zero) are linked onto the general list in
    /// ascending order, so the first allocations hand out the lowest frames.
    /// Descriptors with a positive count stay owned.
    ///
    /// Halts if the table has `u32::MAX` or more entries, or if a descriptor
    /// carries a negative count.
    #[must_use]
    pub fn new(frames: &'a [FrameDescriptor], start: FrameNumber) -> Self {
        let fits = u32::try_from(frames.len()).is_ok_and(|len| len != SENTINEL);
        if !fits {
            fatal(InvariantViolation::FrameTableTooLarge { len: frames.len() });
        }

        let mut lists = FreeLists::empty();
        let mut reserved = 0usize;
        // Reverse so that index 0 ends up at the head.
        for (index, descriptor) in frames.iter().enumerate().rev() {
            #[allow(clippy::cast_possible_truncation)]
            let index = index as u32;
            match descriptor.count() {
                0 => lists.push(FreeList::General, frames, index),
                count if count > 0 => reserved += 1,
                count => fatal(InvariantViolation::NegativeFreeRefCount {
                    index,
                    page: Self::page_at(start, index),
                    count,
                }),
            }
        }

        log::debug!(
            "frame table adopted: {} frames from {start}, {} free, {reserved} reserved",
            frames.len(),
            frames.len() - reserved,
        );

        Self {
            frames,
            start,
            lists: SpinLock::new(lists),
            direct_map: SyncOnceCell::new(),
        }
    }

    /// Install the direct map and mark initialization complete.
    ///
    /// Halts if a direct map is already installed, or if the managed span
    /// reaches past the direct-map ceiling.
    pub fn install_direct_map(&self, map: DirectMap) {
        // One past the last managed frame.
        let end = self.start.as_u64().saturating_add(self.frames.len() as u64);
        if end > DIRECT_MAP_SIZE / FRAME_SIZE {
            fatal(InvariantViolation::TableBeyondDirectMap {
                end: PhysicalAddress::new(end.saturating_mul(FRAME_SIZE)),
                ceiling: DIRECT_MAP_SIZE,
            });
        }
        match self.direct_map.set(map) {
            Ok(map) => log::debug!("direct map installed at {}", map.base()),
            Err(_) => fatal(InvariantViolation::DirectMapReinstalled),
        }
    }

    /// Whether [`install_direct_map`](Self::install_direct_map) has run.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.direct_map.is_initialized()
    }

    /// Halts unless the direct map is installed.
    #[inline]
    pub(crate) fn ensure_initialized(&self) {
        if !self.is_initialized() {
            fatal(InvariantViolation::DirectMapUninitialized);
        }
    }

    /// The installed direct map. Halts before initialization.
    #[inline]
    #[must_use]
    pub fn direct_map(&self) -> &DirectMap {
        match self.direct_map.get() {
            Some(map) => map,
            None => fatal(InvariantViolation::DirectMapUninitialized),
        }
    }

    #[inline]
    #[must_use]
    pub const fn start_frame(&self) -> FrameNumber {
        self.start
    }

    /// Number of managed frames.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame-table index of the frame containing `pa`.
    ///
    /// Halts if the frame is not managed by this table.
    pub(crate) fn index_of(&self, pa: PhysicalAddress) -> u32 {
        let frame = pa.page::<Size4K>().frame_number();
        #[allow(clippy::cast_possible_truncation)]
        let len = self.frames.len() as u32;
        match frame.checked_offset_from(self.start) {
            #[allow(clippy::cast_possible_truncation)]
            Some(offset) if offset < u64::from(len) => offset as u32,
            _ => fatal(InvariantViolation::FrameOutsideTable {
                frame,
                start: self.start,
                len,
            }),
        }
    }

    #[inline]
    pub(crate) fn descriptor(&self, index: u32) -> &FrameDescriptor {
        &self.frames[index as usize]
    }

    #[inline]
    pub(crate) fn page_of(&self, index: u32) -> PhysicalPage<Size4K> {
        Self::page_at(self.start, index)
    }

    fn page_at(start: FrameNumber, index: u32) -> PhysicalPage<Size4K> {
        PhysicalPage::from_frame_number(start + u64::from(index))
    }

    /// Pop the head of `list` and map it. `None` if the list is empty.
    fn take(&self, list: FreeList) -> Option<MappedFrame> {
        self.ensure_initialized();
        let index = {
            let mut lists = self.lists.lock();
            let index = lists.pop(list, self.frames)?;
            let count = self.descriptor(index).count();
            if count < 0 {
                fatal(InvariantViolation::NegativeFreeRefCount {
                    index,
                    page: self.page_of(index),
                    count,
                });
            }
            index
        };
        Some(self.direct_map().frame(self.page_of(index)))
    }

    /// Take one frame from `list`.
    ///
    /// The frame's contents are whatever its last owner left and its count
    /// is zero.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] if the list is empty.
    pub fn allocate(&self, list: FreeList) -> Result<MappedFrame, AllocError> {
        self.take(list).ok_or_else(|| {
            log::warn!("{list} pool exhausted");
            AllocError::Exhausted { pool: list }
        })
    }

    /// Put frame `index` back on `list`.
    pub(crate) fn free(&self, list: FreeList, index: u32) {
        self.lists.lock().push(list, self.frames, index);
    }
}

impl fmt::Debug for PhysicalMemory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PhysicalMemory");
        s.field("start", &self.start)
            .field("frames", &self.frames.len())
            .field("direct_map", &self.direct_map.get());
        match self.lists.try_lock() {
            Some(lists) => s.field("lists", &*lists),
            None => s.field("lists", &format_args!("<locked>")),
        };
        s.finish()
    }
}
