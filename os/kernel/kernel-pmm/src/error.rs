//! Failure kinds of the physical memory manager.
//!
//! Only [`AllocError`] is ever returned as a value. An [`InvariantViolation`]
//! means the frame accounting can no longer be trusted; it is raised through
//! [`fatal`] at the point of detection and never handed back to a caller.

use crate::FreeList;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};

/// A free list had no frame left.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("out of memory ({pool} pool)")]
    Exhausted { pool: FreeList },
}

/// A broken invariant of the frame accounting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("refcount underflow: frame {index} ({page}) dropped to {count}")]
    RefCountUnderflow {
        index: u32,
        page: PhysicalPage<Size4K>,
        count: i32,
    },

    #[error("refcount not positive after increment: frame {index} ({page}) is at {count}")]
    RefCountNotPositive {
        index: u32,
        page: PhysicalPage<Size4K>,
        count: i32,
    },

    #[error("negative refcount on free frame {index} ({page}): {count}")]
    NegativeFreeRefCount {
        index: u32,
        page: PhysicalPage<Size4K>,
        count: i32,
    },

    #[error("frame {frame} is outside the frame table (start {start}, {len} frames)")]
    FrameOutsideTable {
        frame: FrameNumber,
        start: FrameNumber,
        len: u32,
    },

    #[error("frame table of {len} frames exceeds the 32-bit index space")]
    FrameTableTooLarge { len: usize },

    #[error("direct map used before initialization")]
    DirectMapUninitialized,

    #[error("direct map installed twice")]
    DirectMapReinstalled,

    #[error("frame table ends at {end}, past the direct map ceiling {ceiling:#x}")]
    TableBeyondDirectMap { end: PhysicalAddress, ceiling: u64 },

    #[error("direct map base {base} leaves no room for the {size:#x} byte window")]
    DirectMapBaseOverflow { base: VirtualAddress, size: u64 },

    #[error("physical address {address} is beyond the direct map ceiling {ceiling:#x}")]
    BeyondDirectMap { address: PhysicalAddress, ceiling: u64 },

    #[error("address {address} isn't in the direct map at {base}")]
    NotDirectMapped {
        address: VirtualAddress,
        base: VirtualAddress,
    },
}

/// Halt the current context on a broken invariant.
///
/// Logs the violation and panics with the same message. In the kernel the
/// panic handler is the last stop; nothing unwinds into callers.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(violation: InvariantViolation) -> ! {
    log::error!("physical memory invariant violated: {violation}");
    panic!("{violation}");
}
