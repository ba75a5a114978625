//! # Kernel Memory Layout Configuration
//!
//! The single source of truth for the layout constants shared by the
//! physical memory manager and the page-table code.
//!
//! ## Physical Memory Access
//!
//! Physical memory is reached through a fixed-offset **direct map**: every
//! physical address `pa` below [`memory::DIRECT_MAP_SIZE`] is permanently
//! mapped at `HHDM_BASE + pa`.
//!
//! ```text
//! Virtual Address Space Layout (64-bit):
//!
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │         User Space              │
//! LAST_USERSPACE_ADDRESS├─────────────────────────────────┤
//!                       │        Guard Region             │
//! HHDM_BASE             ├─────────────────────────────────┤ 0xffff_8880_0000_0000
//!                       │   Direct Map (512 GiB window)   │
//! HHDM_BASE + 2^39      ├─────────────────────────────────┤ 0xffff_8900_0000_0000
//!                       │          (unused)               │
//! KERNEL_BASE           ├─────────────────────────────────┤ 0xffff_ffff_8000_0000
//!                       │     Kernel Text & Data          │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ## Paging
//!
//! Page tables are the x86-64 four-level layout: 512 entries of 8 bytes per
//! 4 KiB table. [`memory::PAGE_TABLE_LEVELS`] is the default depth used when
//! accounting the entries below a root.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
