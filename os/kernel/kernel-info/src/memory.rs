//! # Memory Layout

/// End of userspace VA range after which Kernel space begins.
pub const LAST_USERSPACE_ADDRESS: u64 = 0xffff_0000_0000_0000;

/// Base of the Higher Half Direct Map (HHDM).
///
/// Physical address `pa` is reachable at `HHDM_BASE + pa` for every
/// `pa < DIRECT_MAP_SIZE`.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Number of bytes of physical memory covered by the direct map (512 GiB).
///
/// Physical addresses at or above this ceiling have no direct-map alias.
pub const DIRECT_MAP_SIZE: u64 = 1 << 39;

/// Where the kernel executes (VMA), matches the linker script.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// Size of one physical frame in bytes.
pub const FRAME_SIZE: u64 = 4096;

/// Number of entries in one page table at any level.
pub const PAGE_TABLE_ENTRIES: usize = 512;

/// Depth of a standard x86-64 page-table tree (PML4 → PDPT → PD → PT).
pub const PAGE_TABLE_LEVELS: u8 = 4;

const _: () = {
    assert!(HHDM_BASE >= LAST_USERSPACE_ADDRESS);
    assert!(HHDM_BASE.checked_add(DIRECT_MAP_SIZE).is_some());
    assert!(HHDM_BASE + DIRECT_MAP_SIZE <= KERNEL_BASE);
    assert!(DIRECT_MAP_SIZE.is_multiple_of(FRAME_SIZE));
    assert!(PAGE_TABLE_ENTRIES as u64 * 8 == FRAME_SIZE);
};
