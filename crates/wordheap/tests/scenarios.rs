//! End-to-end allocator scenarios on small arenas.

use std::ptr::NonNull;

use wordheap::{Chunk, Heap, HeapConfig, WORD_SIZE};

fn heap(words: usize) -> Heap {
    Heap::with_config(HeapConfig::new().capacity_words(words).list_capacity(64)).unwrap()
}

fn addr(p: NonNull<u8>) -> usize {
    p.as_ptr() as usize
}

#[test]
fn test_first_allocation_is_arena_base() {
    let mut heap = heap(10);
    let p = heap.allocate(WORD_SIZE).expect("one word fits");
    assert_eq!(addr(p), heap.arena_base());
    heap.verify();
}

#[test]
fn test_first_fit_reuses_lowest_hole() {
    let mut heap = heap(10);
    let a = heap.allocate(2 * WORD_SIZE).unwrap();
    let _b = heap.allocate(3 * WORD_SIZE).unwrap();
    heap.release(a);

    let c = heap.allocate(2 * WORD_SIZE).unwrap();
    assert_eq!(a, c);
    heap.verify();
}

#[test]
fn test_first_fit_prefers_lower_address_over_better_fit() {
    let mut heap = heap(16);
    let a = heap.allocate(4 * WORD_SIZE).unwrap();
    let _pin1 = heap.allocate(WORD_SIZE).unwrap();
    let b = heap.allocate(2 * WORD_SIZE).unwrap();
    let _pin2 = heap.allocate(WORD_SIZE).unwrap();
    heap.release(a);
    heap.release(b);

    // `b`'s hole is an exact fit, but `a`'s comes first.
    let c = heap.allocate(2 * WORD_SIZE).unwrap();
    assert_eq!(c, a);
}

#[test]
fn test_adjacent_releases_coalesce() {
    let mut heap = heap(10);
    let a = heap.allocate(2 * WORD_SIZE).unwrap();
    let b = heap.allocate(3 * WORD_SIZE).unwrap();
    let _rest = heap.allocate(5 * WORD_SIZE).unwrap();
    heap.release(a);
    heap.release(b);

    // Uncoalesced until the next allocation.
    assert_eq!(heap.freed().len(), 2);

    let c = heap.allocate(5 * WORD_SIZE).expect("coalesced region fits 5 words");
    assert_eq!(c, a);
    assert!(heap.freed().is_empty());
    heap.verify();
}

#[test]
fn test_coalesce_produces_single_region() {
    let mut heap = heap(10);
    let a = heap.allocate(2 * WORD_SIZE).unwrap();
    let b = heap.allocate(3 * WORD_SIZE).unwrap();
    heap.release(a);
    heap.release(b);
    heap.coalesce();
    assert_eq!(
        heap.freed().as_slice(),
        &[Chunk::new(heap.arena_base(), 10)]
    );
}

#[test]
fn test_oversized_request_fails_without_mutation() {
    let mut heap = heap(10);
    heap.allocate(WORD_SIZE).unwrap();
    let allocated = heap.allocated().clone();
    let freed = heap.freed().clone();

    assert!(heap.allocate(11 * WORD_SIZE).is_none());
    assert_eq!(&allocated, heap.allocated());
    assert_eq!(&freed, heap.freed());
}

#[test]
fn test_fragmentation_failure_then_collect_recovers() {
    let mut heap = heap(8);
    let ptrs: Vec<_> = (0..4).map(|_| heap.allocate(2 * WORD_SIZE).unwrap()).collect();
    assert!(heap.allocate(2 * WORD_SIZE).is_none());

    // Keep every other chunk; the freed holes are not adjacent.
    let roots = [addr(ptrs[0]), addr(ptrs[2])];
    heap.collect_with_roots(&roots);
    assert!(heap.allocate(4 * WORD_SIZE).is_none());
    assert!(heap.allocate(2 * WORD_SIZE).is_some());
    heap.verify();
}

#[test]
fn test_round_trip_restores_free_list() {
    let mut heap = heap(32);
    let keep = heap.allocate(3 * WORD_SIZE).unwrap();
    let tmp = heap.allocate(WORD_SIZE).unwrap();
    heap.release(tmp);
    heap.coalesce();
    let before = heap.freed().clone();

    let p = heap.allocate(5 * WORD_SIZE).unwrap();
    heap.release(p);
    heap.coalesce();
    assert_eq!(&before, heap.freed());
    assert!(heap.allocated().find(addr(keep)).is_some());
}

#[test]
fn test_heap_usable_memory() {
    let mut heap = heap(16);
    let p = heap.allocate(4 * WORD_SIZE).unwrap().cast::<usize>();
    unsafe {
        for i in 0..4 {
            p.as_ptr().add(i).write(i * 11);
        }
        for i in 0..4 {
            assert_eq!(p.as_ptr().add(i).read(), i * 11);
        }
    }
}
