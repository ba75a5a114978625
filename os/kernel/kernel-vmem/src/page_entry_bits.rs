use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// A single 64-bit x86-64 page table entry in its raw bitfield form.
///
/// Models the **common superset** of fields found in all four paging levels
/// (PML4E, PDPTE, PDE, PTE).
///
/// ### Bit layout
///
/// | Bits      | Name / Mnemonic   | Meaning |
/// |-----------|-------------------|----------|
/// | 0         | `P` (present)     | Valid entry if set |
/// | 1         | `RW`              | Writable if set |
/// | 2         | `US`              | User-mode accessible if set |
/// | 3         | `PWT`             | Write-through caching |
/// | 4         | `PCD`             | Disable caching |
/// | 5         | `A`               | Accessed |
/// | 6         | `D`               | Dirty (leaf only) |
/// | 7         | `PS`              | Large page flag |
/// | 8         | `G`               | Global (leaf only) |
/// | 9–11      | OS avail low      | Reserved for OS use |
/// | 12–51     | `addr`            | Physical frame bits [51:12] |
/// | 52–62     | OS avail high     | Reserved for OS use / PKU |
/// | 63        | `NX`              | Execute disable |
///
/// ### Example
/// ```rust
/// # use kernel_memory_addresses::PhysicalAddress;
/// # use kernel_vmem::PageEntryBits;
/// let e = PageEntryBits::new()
///     .with_present(true)
///     .with_user_access(true)
///     .with_address(PhysicalAddress::new(0x0012_3000));
/// assert!(e.is_present_user());
/// assert_eq!(e.address().as_u64(), 0x0012_3000);
/// assert_eq!(e.into_bits(), 0x0012_3005);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2). Set to allow user-mode access.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6), leaf only. Set by the CPU.
    pub dirty: bool,

    /// Large Page / Page Size (PS, bit 7).
    ///
    /// In a PDPTE or PDE this turns the entry into a 1 GiB or 2 MiB **leaf**
    /// whose address is a page, not a next-level table. In a 4 KiB PTE the
    /// same bit position is PAT.
    pub large_page: bool,

    /// Global (G, bit 8), leaf only.
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical address bits [51:12] (bits 12..=51).
    #[bits(40)]
    phys_addr_bits_51_12: u64,

    /// OS-available / protection key (bits 52..=62).
    #[bits(11)]
    pub os_available_high: u16,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl PageEntryBits {
    /// Physical address stored in bits 12..=51.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.phys_addr_bits_51_12() << 12)
    }

    /// The 4 KiB frame the address bits point at (a child table, or a page).
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(self.address())
    }

    #[inline]
    pub const fn set_address(&mut self, phys: PhysicalAddress) {
        self.set_phys_addr_bits_51_12(phys.as_u64() >> 12);
    }

    #[inline]
    #[must_use]
    pub const fn with_address(self, phys: PhysicalAddress) -> Self {
        self.with_phys_addr_bits_51_12(phys.as_u64() >> 12)
    }

    /// Both `present` and `user_access` are set: a live user mapping.
    #[inline]
    #[must_use]
    pub const fn is_present_user(&self) -> bool {
        self.present() && self.user_access()
    }

    /// Flags for a user-accessible, writable entry at any level.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
    }

    /// Flags for a kernel-only, writable, global leaf.
    #[inline]
    #[must_use]
    pub const fn kernel_rw_global() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_global_translation(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bit_positions() {
        assert_eq!(PageEntryBits::new().with_present(true).into_bits(), 1 << 0);
        assert_eq!(PageEntryBits::new().with_writable(true).into_bits(), 1 << 1);
        assert_eq!(PageEntryBits::new().with_user_access(true).into_bits(), 1 << 2);
        assert_eq!(PageEntryBits::new().with_cache_disabled(true).into_bits(), 1 << 4);
        assert_eq!(PageEntryBits::new().with_large_page(true).into_bits(), 1 << 7);
        assert_eq!(
            PageEntryBits::new().with_global_translation(true).into_bits(),
            1 << 8
        );
        assert_eq!(PageEntryBits::new().with_no_execute(true).into_bits(), 1 << 63);
    }

    #[test]
    fn address_bits_drop_page_offset() {
        let mut e = PageEntryBits::user_rw();
        e.set_address(PhysicalAddress::new(0x0000_0012_3456_7FFF));
        assert_eq!(e.address().as_u64(), 0x0000_0012_3456_7000);
        assert!(e.present() && e.writable() && e.user_access());
        assert_eq!(e.frame().base(), e.address());
    }

    #[test]
    fn present_user_requires_both_flags() {
        assert!(PageEntryBits::user_rw().is_present_user());
        assert!(!PageEntryBits::kernel_rw_global().is_present_user());
        assert!(!PageEntryBits::new().with_user_access(true).is_present_user());
    }
}
