//! # Direct-Map Translator
//!
//! Every physical address below [`DIRECT_MAP_SIZE`] is permanently mapped at
//! `base + pa`. Translating is pure arithmetic and never takes a lock.
//!
//! This is the only module that turns integer addresses into pointers. The
//! rest of the crate reaches frame contents through the [`MappedFrame`]
//! handles and byte views produced here.
//!
//! ```text
//!   physical                          virtual
//! 0x0000_0000 ──────────────┐      ┌── base
//!             │ frame n     │ ───► │ base + n * 4096
//! 2^39        ──────────────┘      └── base + 2^39
//! ```

use crate::error::{InvariantViolation, fatal};
use core::fmt;
use core::ptr::NonNull;
use kernel_info::memory::{DIRECT_MAP_SIZE, FRAME_SIZE};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_vmem::{PageTable, PhysMapper};

/// The bytes of one physical frame.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct FrameBytes(pub [u8; FRAME_SIZE as usize]);

impl FrameBytes {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; FRAME_SIZE as usize])
    }

    #[must_use]
    pub const fn filled(byte: u8) -> Self {
        Self([byte; FRAME_SIZE as usize])
    }
}

/// Canonical all-zero frame copied over freshly allocated pages.
pub(crate) static ZERO_FRAME: FrameBytes = FrameBytes::zeroed();

/// Fixed-offset translation between physical addresses and kernel pointers.
pub struct DirectMap {
    base: NonNull<u8>,
}

// SAFETY: `base` is only used for address arithmetic; the mapping itself is
// global and immutable.
unsafe impl Send for DirectMap {}
unsafe impl Sync for DirectMap {}

impl DirectMap {
    /// Direct map at a fixed virtual base, such as
    /// [`HHDM_BASE`](kernel_info::memory::HHDM_BASE).
    ///
    /// # Safety
    /// `[base, base + DIRECT_MAP_SIZE)` must map physical memory `[0, DIRECT_MAP_SIZE)`
    /// for as long as this value is used.
    #[must_use]
    pub unsafe fn new(base: VirtualAddress) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let ptr = core::ptr::with_exposed_provenance_mut::<u8>(base.as_u64() as usize);
        // SAFETY: forwarded to the caller.
        unsafe { Self::from_ptr(ptr) }
    }

    /// Direct map whose base is given as a pointer.
    ///
    /// The base itself need not point into an allocation: only `base + pa`
    /// for managed frames is ever dereferenced. Pointers derived from it keep
    /// the provenance of `base`.
    ///
    /// # Safety
    /// Same contract as [`new`](Self::new).
    #[must_use]
    pub unsafe fn from_ptr(base: *mut u8) -> Self {
        let Some(base) = NonNull::new(base) else {
            fatal(InvariantViolation::DirectMapBaseOverflow {
                base: VirtualAddress::new(0),
                size: DIRECT_MAP_SIZE,
            })
        };
        let start = VirtualAddress::from_nonnull(base);
        if start.as_u64().checked_add(DIRECT_MAP_SIZE).is_none() {
            fatal(InvariantViolation::DirectMapBaseOverflow {
                base: start,
                size: DIRECT_MAP_SIZE,
            });
        }
        Self { base }
    }

    /// Virtual address physical address zero is mapped at.
    #[inline]
    #[must_use]
    pub fn base(&self) -> VirtualAddress {
        VirtualAddress::from_nonnull(self.base)
    }

    #[inline]
    fn check_ceiling(pa: PhysicalAddress) {
        if pa.as_u64() >= DIRECT_MAP_SIZE {
            fatal(InvariantViolation::BeyondDirectMap {
                address: pa,
                ceiling: DIRECT_MAP_SIZE,
            });
        }
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn offset_ptr(&self, pa: PhysicalAddress) -> NonNull<u8> {
        // Below the ceiling and `base + DIRECT_MAP_SIZE` was checked not to
        // wrap, so the sum is never null.
        let ptr = self.base.as_ptr().wrapping_add(pa.as_u64() as usize);
        // SAFETY: see above.
        unsafe { NonNull::new_unchecked(ptr) }
    }

    /// Pointer to the frame containing `pa` (the address is aligned down).
    ///
    /// Halts if `pa` is at or above the direct-map ceiling.
    #[inline]
    #[must_use]
    pub fn to_virtual(&self, pa: PhysicalAddress) -> NonNull<FrameBytes> {
        Self::check_ceiling(pa);
        self.offset_ptr(pa.align_down::<Size4K>()).cast()
    }

    /// Physical address a direct-map pointer refers to.
    ///
    /// Halts if `ptr` lies below the base or past the end of the window.
    #[must_use]
    pub fn to_physical<T: ?Sized>(&self, ptr: NonNull<T>) -> PhysicalAddress {
        let address = VirtualAddress::from_nonnull(ptr);
        match address.checked_offset_from(self.base()) {
            Some(offset) if offset < DIRECT_MAP_SIZE => PhysicalAddress::new(offset),
            _ => fatal(InvariantViolation::NotDirectMapped {
                address,
                base: self.base(),
            }),
        }
    }

    /// Bytes from `pa` to the end of its frame.
    ///
    /// For unaligned or sub-page access; the view never crosses into the
    /// next frame.
    #[must_use]
    pub fn bytes_at(&self, pa: PhysicalAddress) -> NonNull<[u8]> {
        Self::check_ceiling(pa);
        let len = FRAME_SIZE - pa.offset::<Size4K>().as_u64();
        #[allow(clippy::cast_possible_truncation)]
        NonNull::slice_from_raw_parts(self.offset_ptr(pa), len as usize)
    }

    /// Handle for the frame at `page`.
    #[inline]
    #[must_use]
    pub fn frame(&self, page: PhysicalPage<Size4K>) -> MappedFrame {
        MappedFrame {
            page,
            ptr: self.to_virtual(page.base()),
        }
    }
}

impl PhysMapper for DirectMap {
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> NonNull<T> {
        self.bytes_at(pa).cast()
    }
}

impl fmt::Debug for DirectMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectMap")
            .field("base", &self.base())
            .field("size", &format_args!("{DIRECT_MAP_SIZE:#x}"))
            .finish()
    }
}

/// A frame together with its direct-map alias.
///
/// Returned by the allocation API. The handle does not own a reference
/// count; it is only a typed view of the frame.
pub struct MappedFrame {
    page: PhysicalPage<Size4K>,
    ptr: NonNull<FrameBytes>,
}

impl MappedFrame {
    #[inline]
    #[must_use]
    pub const fn page(&self) -> PhysicalPage<Size4K> {
        self.page
    }

    #[inline]
    #[must_use]
    pub const fn phys(&self) -> PhysicalAddress {
        self.page.base()
    }

    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> NonNull<FrameBytes> {
        self.ptr
    }

    /// Borrow the frame's bytes.
    ///
    /// # Safety
    /// No context may write to the frame for `'a`.
    #[inline]
    #[must_use]
    pub unsafe fn bytes<'a>(&self) -> &'a FrameBytes {
        unsafe { self.ptr.as_ref() }
    }

    /// Mutably borrow the frame's bytes.
    ///
    /// # Safety
    /// The caller must be the frame's only user for `'a`; in particular the
    /// frame must not have been released back to a free list.
    #[inline]
    #[must_use]
    pub unsafe fn bytes_mut<'a>(&self) -> &'a mut FrameBytes {
        unsafe { &mut *self.ptr.as_ptr() }
    }

    /// View the frame as a page table.
    ///
    /// # Safety
    /// Same contract as [`bytes_mut`](Self::bytes_mut).
    #[inline]
    #[must_use]
    pub unsafe fn as_page_table<'a>(&self) -> &'a mut PageTable {
        unsafe { &mut *self.ptr.cast::<PageTable>().as_ptr() }
    }
}

impl fmt::Debug for MappedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFrame")
            .field("page", &self.page)
            .field("virt", &VirtualAddress::from_nonnull(self.ptr))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_info::memory::HHDM_BASE;

    fn hhdm() -> DirectMap {
        unsafe { DirectMap::new(VirtualAddress::new(HHDM_BASE)) }
    }

    #[test]
    fn to_virtual_aligns_down() {
        let dm = hhdm();
        let v = dm.to_virtual(PhysicalAddress::new(0x0012_3456));
        assert_eq!(VirtualAddress::from_nonnull(v).as_u64(), HHDM_BASE + 0x0012_3000);
    }

    #[test]
    fn to_physical_inverts_to_virtual() {
        let dm = hhdm();
        for pa in [0, 0x1000, 0x0012_3456, DIRECT_MAP_SIZE - 1] {
            let pa = PhysicalAddress::new(pa);
            let v = dm.to_virtual(pa);
            assert_eq!(dm.to_physical(v), pa.align_down::<Size4K>());
            assert_eq!(dm.to_virtual(dm.to_physical(v)), v);
        }
    }

    #[test]
    fn bytes_at_runs_to_end_of_frame() {
        let dm = hhdm();
        let view = dm.bytes_at(PhysicalAddress::new(0x5234));
        assert_eq!(view.len(), 0x1000 - 0x234);
        assert_eq!(VirtualAddress::from_nonnull(view).as_u64(), HHDM_BASE + 0x5234);
        assert_eq!(dm.bytes_at(PhysicalAddress::new(0x6000)).len(), 0x1000);
    }

    #[test]
    fn phys_mapper_keeps_in_page_offset() {
        let dm = hhdm();
        let p: NonNull<u64> = dm.phys_to_ptr(PhysicalAddress::new(0x7008));
        assert_eq!(VirtualAddress::from_nonnull(p).as_u64(), HHDM_BASE + 0x7008);
    }

    #[test]
    fn frame_handle_writes_through_shared_reference() {
        let mut ram = vec![FrameBytes::zeroed(); 2];
        let dm = unsafe { DirectMap::from_ptr(ram.as_mut_ptr().cast()) };
        let frame = dm.frame(PhysicalPage::from_addr(PhysicalAddress::new(0x1000)));

        unsafe { frame.bytes_mut() }.0[8] = 0x03;
        let table = unsafe { frame.as_page_table() };
        assert!(table.entry(1).present());
        assert!(table.entry(1).writable());
        table.set_entry(2, kernel_vmem::PageEntryBits::user_rw());
        assert_eq!(unsafe { frame.bytes() }.0[16], 0x07);
        assert_eq!(ram[1].0[16], 0x07);
        assert!(ram[0].0.iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "beyond the direct map ceiling")]
    fn ceiling_is_exclusive() {
        let _ = hhdm().to_virtual(PhysicalAddress::new(DIRECT_MAP_SIZE));
    }

    #[test]
    #[should_panic(expected = "isn't in the direct map")]
    fn pointer_below_base_is_fatal() {
        let dm = hhdm();
        let below = NonNull::<u8>::dangling();
        let _ = dm.to_physical(below);
    }
}
