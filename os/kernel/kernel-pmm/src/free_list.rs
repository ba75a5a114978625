//! # Free Lists
//!
//! Two intrusive singly linked lists threaded through the `next_free` link of
//! each [`FrameDescriptor`]. Only the heads live here; every link is stored
//! in the frame table itself, so pushing and popping never allocate.
//!
//! ```text
//! heads[General]    ─► 3 ─► 0 ─► 1 ─► SENTINEL
//! heads[PageTables] ─► 5 ─► SENTINEL
//! ```
//!
//! [`FreeLists`] is always kept behind the free-list lock. Holding
//! `&mut FreeLists` is the proof that the links may be touched.

use crate::frame_table::{FrameDescriptor, SENTINEL};
use core::fmt;

/// Which pool a frame is taken from or returned to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FreeList {
    /// Ordinary pages. Refcount drops to zero land here.
    General,
    /// Frames recycled from released page-table roots.
    PageTables,
}

impl FreeList {
    pub const ALL: [Self; 2] = [Self::General, Self::PageTables];

    #[inline]
    const fn slot(self) -> usize {
        match self {
            Self::General => 0,
            Self::PageTables => 1,
        }
    }
}

impl fmt::Display for FreeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::General => "general",
            Self::PageTables => "page-table",
        })
    }
}

/// Heads of both free lists.
pub(crate) struct FreeLists {
    heads: [u32; 2],
}

impl FreeLists {
    pub(crate) const fn empty() -> Self {
        Self {
            heads: [SENTINEL; 2],
        }
    }

    /// Unlink and return the head of `list`.
    pub(crate) fn pop(&mut self, list: FreeList, frames: &[FrameDescriptor]) -> Option<u32> {
        let head = self.heads[list.slot()];
        if head == SENTINEL {
            return None;
        }
        let descriptor = &frames[head as usize];
        self.heads[list.slot()] = descriptor.next_free();
        descriptor.set_next_free(SENTINEL);
        Some(head)
    }

    /// Link `index` in as the new head of `list`.
    pub(crate) fn push(&mut self, list: FreeList, frames: &[FrameDescriptor], index: u32) {
        frames[index as usize].set_next_free(self.heads[list.slot()]);
        self.heads[list.slot()] = index;
    }

    /// Indices on `list`, head first.
    pub(crate) fn iter<'f>(&self, list: FreeList, frames: &'f [FrameDescriptor]) -> Iter<'f> {
        Iter {
            frames,
            next: self.heads[list.slot()],
        }
    }
}

impl fmt::Debug for FreeLists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = |list: FreeList| {
            let h = self.heads[list.slot()];
            (h != SENTINEL).then_some(h)
        };
        f.debug_struct("FreeLists")
            .field("general", &head(FreeList::General))
            .field("page_tables", &head(FreeList::PageTables))
            .finish()
    }
}

/// Walks one free list.
pub(crate) struct Iter<'f> {
    frames: &'f [FrameDescriptor],
    next: u32,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next == SENTINEL {
            return None;
        }
        let current = self.next;
        self.next = self.frames[current as usize].next_free();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> Vec<FrameDescriptor> {
        (0..n).map(|_| FrameDescriptor::free()).collect()
    }

    #[test]
    fn pop_on_empty_list() {
        let frames = table(2);
        let mut lists = FreeLists::empty();
        assert_eq!(lists.iter(FreeList::General, &frames).count(), 0);
        assert_eq!(lists.pop(FreeList::General, &frames), None);
    }

    #[test]
    fn push_then_pop_is_lifo() {
        let frames = table(4);
        let mut lists = FreeLists::empty();
        for i in [0, 2, 3] {
            lists.push(FreeList::General, &frames, i);
        }
        assert_eq!(lists.iter(FreeList::General, &frames).collect::<Vec<_>>(), [3, 2, 0]);
        assert_eq!(lists.pop(FreeList::General, &frames), Some(3));
        assert_eq!(lists.pop(FreeList::General, &frames), Some(2));
        assert_eq!(lists.pop(FreeList::General, &frames), Some(0));
        assert_eq!(lists.pop(FreeList::General, &frames), None);
    }

    #[test]
    fn popped_frame_is_unlinked() {
        let frames = table(2);
        let mut lists = FreeLists::empty();
        lists.push(FreeList::General, &frames, 0);
        lists.push(FreeList::General, &frames, 1);
        assert_eq!(lists.pop(FreeList::General, &frames), Some(1));
        assert_eq!(frames[1].next_free(), SENTINEL);
    }

    #[test]
    fn lists_are_independent() {
        let frames = table(3);
        let mut lists = FreeLists::empty();
        lists.push(FreeList::General, &frames, 0);
        lists.push(FreeList::PageTables, &frames, 1);
        lists.push(FreeList::PageTables, &frames, 2);
        assert_eq!(lists.iter(FreeList::General, &frames).count(), 1);
        assert_eq!(lists.iter(FreeList::PageTables, &frames).collect::<Vec<_>>(), [2, 1]);
        assert_eq!(
            format!("{lists:?}"),
            "FreeLists { general: Some(0), page_tables: Some(2) }"
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(FreeList::General.to_string(), "general");
        assert_eq!(FreeList::PageTables.to_string(), "page-table");
    }
}
