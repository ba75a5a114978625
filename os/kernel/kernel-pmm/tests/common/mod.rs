//! Host stand-in for a machine's physical memory.
//!
//! Frames live in a leaked, 4 KiB-aligned `Vec`. The direct map is based so
//! that physical address `START_FRAME * 4096` lands on the first buffer
//! frame. Everything is leaked so the manager can be shared as `'static`
//! across test threads.

#![allow(dead_code)]

use kernel_memory_addresses::{FrameNumber, PhysicalAddress};
use kernel_pmm::{DirectMap, FrameBytes, FrameDescriptor, MappedFrame, PhysicalMemory};

/// First managed frame; physical memory below it is not in the table.
pub const START_FRAME: u64 = 0x100;

/// Byte every frame starts out filled with, so zero-filling is observable.
pub const POISON: u8 = 0xa5;

pub type Pmm = &'static PhysicalMemory<'static>;

/// Physical address of frame-table index `index`.
pub fn pa(index: u64) -> PhysicalAddress {
    PhysicalAddress::new((START_FRAME + index) << 12)
}

/// Frame-table index of an allocated frame.
pub fn index(frame: &MappedFrame) -> u64 {
    frame.page().frame_number().as_u64() - START_FRAME
}

fn leak_table(descriptors: Vec<FrameDescriptor>) -> Pmm {
    let frames: &'static [FrameDescriptor] = Vec::leak(descriptors);
    Box::leak(Box::new(PhysicalMemory::new(frames, FrameNumber::new(START_FRAME))))
}

fn direct_map_for(frames: usize) -> DirectMap {
    let ram: &'static mut [FrameBytes] = Vec::leak(vec![FrameBytes::filled(POISON); frames]);
    let base = ram
        .as_mut_ptr()
        .cast::<u8>()
        .wrapping_sub(usize::try_from(START_FRAME << 12).unwrap());
    // SAFETY: only managed frames are ever translated, and those land in `ram`.
    unsafe { DirectMap::from_ptr(base) }
}

/// `n` free frames with the direct map installed.
pub fn machine(n: usize) -> Pmm {
    with_descriptors((0..n).map(|_| FrameDescriptor::free()).collect())
}

/// A frame table whose direct map has not been installed yet.
pub fn uninitialized(n: usize) -> (Pmm, DirectMap) {
    let pmm = leak_table((0..n).map(|_| FrameDescriptor::free()).collect());
    (pmm, direct_map_for(n))
}

/// A machine with explicit starting descriptors.
pub fn with_descriptors(descriptors: Vec<FrameDescriptor>) -> Pmm {
    let n = descriptors.len();
    let pmm = leak_table(descriptors);
    pmm.install_direct_map(direct_map_for(n));
    pmm
}

/// Frames with a positive count, by scanning the whole table.
pub fn owned_frames(pmm: Pmm) -> usize {
    (0..pmm.frame_count() as u64)
        .filter(|&i| pmm.ref_count(pa(i)) > 0)
        .count()
}
