//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses, page bases, and frame
//! numbers used by the physical memory manager and the paging code.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A byte in physical memory (RAM or MMIO). |
//! | [`VirtualAddress`] | A byte in the current virtual address space. |
//! | [`PhysicalPage<S>`] | The page-aligned base of a physical page of size `S`. |
//! | [`MemoryAddressOffset<S>`] | The offset of an address within its page of size `S`. |
//! | [`FrameNumber`] | A physical address divided by the frame size. |
//!
//! All types are `#[repr(transparent)]` over `u64` and zero-cost.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
//! let (page, off) = pa.split::<Size4K>();
//! assert_eq!(page.base().as_u64(), 0x0000_0010_2000_0000);
//! assert_eq!(off.as_u64(), 0x42);
//! assert_eq!(page.join(off), pa);
//!
//! let frame = page.frame_number();
//! assert_eq!(PhysicalPage::<Size4K>::from_frame_number(frame), page);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod frame_number;
mod memory_address_offset;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use frame_number::FrameNumber;
pub use memory_address_offset::MemoryAddressOffset;
pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
