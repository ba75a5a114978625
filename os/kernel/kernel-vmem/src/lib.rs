//! # Virtual Memory Support
//!
//! x86-64 paging structures as seen by the physical memory manager.
//!
//! ## What you get
//! - [`PageEntryBits`]: the raw 64-bit entry layout shared by all four levels.
//! - [`PageTable`]: a 4 KiB-aligned table of 512 entries.
//! - [`PhysMapper`]: the seam through which page-table code reaches physical
//!   frames (direct map in the kernel, plain buffers in tests).
//! - [`accounting`]: counting the live user mappings below a root.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! Each level holds 512 entries. A PDPTE or PDE with `PS=1` is a leaf that
//! maps a 1 GiB or 2 MiB page directly; a PTE is always a leaf.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod accounting;
mod page_entry_bits;
mod page_table;

use core::ptr::NonNull;
use kernel_memory_addresses::PhysicalAddress;

pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::PageTable;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Converts physical addresses into pointers usable in the current address
/// space.
///
/// In the kernel this is a fixed-offset direct map. Computing the pointer is
/// plain arithmetic and safe; dereferencing it is not.
pub trait PhysMapper {
    /// Pointer through which the bytes at `pa` can be reached.
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> NonNull<T>;

    /// Borrow the `T` stored at `pa`.
    ///
    /// # Safety
    /// - `pa` must hold a valid, suitably aligned `T`.
    /// - Nothing may write to it for `'a`.
    #[inline]
    unsafe fn phys_to_ref<'a, T>(&self, pa: PhysicalAddress) -> &'a T {
        unsafe { self.phys_to_ptr::<T>(pa).as_ref() }
    }

    /// Mutably borrow the `T` stored at `pa`.
    ///
    /// # Safety
    /// - `pa` must hold a valid, suitably aligned `T`.
    /// - No other reference to it may exist for `'a`.
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { self.phys_to_ptr::<T>(pa).as_mut() }
    }
}
