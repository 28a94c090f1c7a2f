//! End-to-end arena scenarios: allocation laws, destructor ordering,
//! growth policy, and allocator-adapter behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use quill_arena::{local_metrics, Arena, ArenaManaged, ArenaOptions, ArenaVec};

#[test]
fn aligned_allocations_are_distinct_and_accounted() {
    let arena = Arena::new();

    let mut ranges: Vec<(usize, usize)> = (0..1000)
        .map(|_| {
            let ptr = arena.allocate_aligned_to(1, 8).unwrap();
            let addr = ptr.as_ptr() as usize;
            assert_eq!(addr % 8, 0);
            (addr, addr + 1)
        })
        .collect();

    // Pairwise disjoint byte ranges.
    ranges.sort_unstable();
    for window in ranges.windows(2) {
        assert!(window[0].1 <= window[1].0);
    }

    assert_eq!(arena.space_used(), 1000);
}

#[test]
fn destructors_run_once_in_reverse_construction_order() {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    static ORDER: Mutex<Vec<usize>> = Mutex::new(Vec::new());

    struct Session(usize);

    impl Drop for Session {
        fn drop(&mut self) {
            COUNTER.fetch_add(1, Ordering::SeqCst);
            ORDER.lock().unwrap().push(self.0);
        }
    }

    // SAFETY: constructed and dropped only through the arena.
    unsafe impl ArenaManaged for Session {}

    {
        let arena = Arena::new();
        for i in 0..5 {
            arena.create(Session(i)).unwrap();
        }
        assert_eq!(COUNTER.load(Ordering::SeqCst), 0);
    }

    assert_eq!(COUNTER.load(Ordering::SeqCst), 5);
    assert_eq!(*ORDER.lock().unwrap(), vec![4, 3, 2, 1, 0]);
}

#[test]
fn repeated_allocation_grows_the_chain() {
    let arena = Arena::with_options(
        ArenaOptions::new()
            .with_normal_block_size(4096)
            .with_huge_block_size(65536),
    );

    for _ in 0..12 {
        arena.allocate_aligned(1000).unwrap();
    }

    assert!(arena.block_count() >= 2);
    assert_eq!(arena.space_used(), 12_000);
    assert!(arena.space_allocated() >= arena.space_used());
}

#[test]
fn request_beyond_huge_block_size_gets_dedicated_block() {
    let arena = Arena::with_options(
        ArenaOptions::new()
            .with_normal_block_size(4096)
            .with_huge_block_size(65536),
    );

    let request = 65536 + 4096;
    let ptr = arena.allocate_aligned(request).unwrap();
    assert!(!ptr.as_ptr().is_null());

    // The dedicated block is sized for the request, with only header and
    // alignment overhead on top.
    assert!(arena.space_allocated() >= request);
    assert!(arena.space_allocated() <= request + 256);
}

#[test]
fn trivial_element_vectors_register_no_cleanups() {
    let cleanups_before = local_metrics().cleanup_count;
    let mut arena = Arena::new();

    {
        let mut first = ArenaVec::new_in(arena.resource());
        for i in 0..100i32 {
            first.push(i);
        }
        assert_eq!(first.len(), 100);
    }

    arena.reset();

    {
        let mut second = ArenaVec::new_in(arena.resource());
        for i in 0..50i32 {
            second.push(i);
        }
        assert_eq!(second.len(), 50);
    }

    drop(arena);
    assert_eq!(local_metrics().cleanup_count, cleanups_before);
}

#[test]
fn cleanups_run_per_epoch_and_never_twice() {
    static LOG: Mutex<Vec<u32>> = Mutex::new(Vec::new());

    unsafe fn log_value(p: *mut u8) {
        let value = unsafe { Box::from_raw(p.cast::<u32>()) };
        LOG.lock().unwrap().push(*value);
    }

    let mut arena = Arena::new();

    for value in [1u32, 2, 3] {
        let object = Box::into_raw(Box::new(value));
        // SAFETY: object stays valid until the reset below consumes it.
        unsafe { arena.register_cleanup(object.cast(), log_value).unwrap() };
    }

    arena.reset();
    assert_eq!(*LOG.lock().unwrap(), vec![3, 2, 1]);

    for value in [4u32, 5] {
        let object = Box::into_raw(Box::new(value));
        // SAFETY: object stays valid until the arena is dropped.
        unsafe { arena.register_cleanup(object.cast(), log_value).unwrap() };
    }

    drop(arena);
    assert_eq!(*LOG.lock().unwrap(), vec![3, 2, 1, 5, 4]);
}

#[test]
fn reset_is_idempotent() {
    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Once;
    impl Drop for Once {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }
    // SAFETY: constructed and dropped only through the arena.
    unsafe impl ArenaManaged for Once {}

    let mut arena = Arena::new();
    arena.create(Once).unwrap();

    arena.reset();
    assert_eq!(arena.space_used(), 0);
    assert_eq!(DROPS.load(Ordering::SeqCst), 1);

    // A second reset on an untouched arena reclaims nothing and re-runs
    // nothing.
    assert_eq!(arena.reset(), 0);
    assert_eq!(DROPS.load(Ordering::SeqCst), 1);
}

#[test]
fn pointers_are_stable_between_resets() {
    let mut arena = Arena::with_options(ArenaOptions::new().with_normal_block_size(1024));

    let first = arena.create(0xDEAD_BEEF_u64).unwrap() as *mut u64;
    // Force growth so earlier blocks would move if anything moved.
    for _ in 0..64 {
        arena.allocate_aligned(512).unwrap();
    }

    // SAFETY: no reset has happened; the allocation is still live.
    assert_eq!(unsafe { *first }, 0xDEAD_BEEF_u64);

    arena.reset();
    let second = arena.create(1u64).unwrap();
    assert_eq!(*second, 1);
}

#[test]
fn accounting_ignores_padding() {
    let arena = Arena::new();

    arena.allocate_aligned_to(1, 1).unwrap();
    arena.allocate_aligned_to(8, 64).unwrap();
    arena.allocate_aligned_to(3, 1).unwrap();

    assert_eq!(arena.space_used(), 12);
    assert!(arena.space_wasted() > 0);
}
