mod common;

use common::{Pmm, machine, owned_frames, pa};
use kernel_pmm::FreeList;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

const THREADS: usize = 8;

fn run(pmm: Pmm, work: impl Fn(Pmm, usize) + Send + Sync + 'static) {
    let start = Arc::new(Barrier::new(THREADS));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let start = Arc::clone(&start);
            let work = Arc::clone(&work);
            thread::spawn(move || {
                start.wait();
                work(pmm, t);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn concurrent_allocations_never_share_a_frame() {
    const FRAMES: usize = 32;
    let pmm = machine(FRAMES);
    let held = Arc::new(Mutex::new(HashSet::new()));
    let exhausted = Arc::new(AtomicUsize::new(0));

    {
        let held = Arc::clone(&held);
        let exhausted = Arc::clone(&exhausted);
        run(pmm, move |pmm, t| {
            let mut mine = Vec::new();
            for i in 0..2_000 {
                if i % 3 == 2 {
                    if let Some(phys) = mine.pop() {
                        assert!(held.lock().unwrap().remove(&phys));
                        assert!(pmm.decrement(phys));
                    }
                    continue;
                }
                match pmm.new_raw_page() {
                    Ok(frame) => {
                        pmm.increment(frame.phys());
                        assert!(held.lock().unwrap().insert(frame.phys()), "frame handed out twice");
                        unsafe { frame.bytes_mut() }.0[0] = u8::try_from(t).unwrap();
                        mine.push(frame.phys());
                    }
                    Err(_) => {
                        exhausted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            for phys in mine {
                assert!(held.lock().unwrap().remove(&phys));
                assert!(pmm.decrement(phys));
            }
        });
    }

    assert!(held.lock().unwrap().is_empty());
    assert_eq!(pmm.free_count(FreeList::General), FRAMES);
    assert_eq!(owned_frames(pmm), 0);
}

#[test]
fn shared_frame_is_freed_exactly_once() {
    let pmm = machine(2);
    let frame = pmm.new_raw_page().unwrap();
    let phys = frame.phys();
    pmm.increment(phys);
    let last_seen = Arc::new(AtomicUsize::new(0));

    {
        let last_seen = Arc::clone(&last_seen);
        run(pmm, move |pmm, _| {
            for _ in 0..5_000 {
                pmm.increment(phys);
            }
            for _ in 0..5_000 {
                if pmm.decrement(phys) {
                    last_seen.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    assert_eq!(last_seen.load(Ordering::Relaxed), 0);
    assert_eq!(pmm.ref_count(phys), 1);
    assert!(pmm.decrement(phys));
    assert_eq!(pmm.free_count(FreeList::General), 2);
}

#[test]
fn roots_and_pages_are_conserved_across_pools() {
    const FRAMES: usize = 24;
    let pmm = machine(FRAMES);

    run(pmm, |pmm, t| {
        for i in 0..1_000 {
            let frame = if (i + t) % 2 == 0 {
                pmm.new_page_table_root()
            } else {
                pmm.new_raw_page()
            };
            let Ok(frame) = frame else { continue };
            pmm.increment(frame.phys());
            if i % 4 == 0 {
                assert!(pmm.release_page_table_root(frame.phys()));
            } else {
                assert!(pmm.decrement(frame.phys()));
            }
        }
    });

    let general = pmm.free_count(FreeList::General);
    let tables = pmm.free_count(FreeList::PageTables);
    assert_eq!(general + tables, FRAMES);
    assert_eq!(owned_frames(pmm), 0);
    assert_eq!(pmm.ref_count(pa(0)), 0);
}
