//! # Kernel synchronization primitives
//!
//! - [`SpinLock`]: a test-and-test-and-set lock for short critical sections,
//!   such as free-list head updates.
//! - [`SyncOnceCell`]: a value written exactly once during boot and read
//!   lock-free afterwards.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;
mod sync_once_cell;

pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
