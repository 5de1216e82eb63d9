//! The thread-local heap surface.

use wordheap::{global, stack_marker, HeapConfig, ListKind, WORD_SIZE};

#[inline(never)]
fn build_garbage(n: usize) {
    for _ in 0..n {
        global::allocate(4 * WORD_SIZE).unwrap();
    }
}

#[test]
fn test_global_allocate_release_dump() {
    global::init(HeapConfig::new().capacity_words(64)).unwrap();

    let a = global::allocate(WORD_SIZE).unwrap();
    let b = global::allocate(WORD_SIZE).unwrap();
    global::release(a);

    assert!(global::dump(ListKind::Allocated).starts_with("Allocated Chunks (1):"));
    assert!(global::dump(ListKind::Freed).starts_with("Freed Chunks (2):"));

    global::release(b);
    global::with_heap(|heap| heap.verify());
    assert!(global::teardown());
}

#[inline(never)]
fn allocate_and_collect_below() -> bool {
    let live = global::allocate(2 * WORD_SIZE).unwrap();
    let slot = [live];
    std::hint::black_box(&slot);

    global::collect();
    let found = global::with_heap(|heap| heap.allocated().find(live.as_ptr() as usize)).is_some();
    std::hint::black_box(&slot);
    found
}

#[test]
fn test_global_collect_keeps_stack_reference() {
    global::init(HeapConfig::new().capacity_words(256)).unwrap();
    if !global::with_heap(|heap| heap.bind_to_thread_stack()) {
        global::teardown();
        return;
    }

    build_garbage(4);
    let live = global::allocate(2 * WORD_SIZE).unwrap();
    let slot = [live];
    std::hint::black_box(&slot);

    let stats = global::collect();
    assert!(global::with_heap(|heap| heap.allocated().find(live.as_ptr() as usize)).is_some());
    assert_eq!(stats.chunks_reclaimed + stats.chunks_surviving, 5);
    std::hint::black_box(&slot);

    global::teardown();
}

#[test]
fn test_marker_bound_covers_callee_frames() {
    global::init(HeapConfig::new().capacity_words(64)).unwrap();
    // SAFETY: the marker frame outlives every collection below it.
    unsafe { global::set_stack_root_bound(stack_marker!()) };
    assert!(allocate_and_collect_below());
    global::teardown();
}

#[inline(never)]
fn scrub_stack() {
    let buf = [0usize; 8192];
    std::hint::black_box(&buf);
}

#[test]
fn test_global_collect_reclaims_dropped_garbage() {
    global::init(HeapConfig::new().capacity_words(256)).unwrap();
    if !global::with_heap(|heap| heap.bind_to_thread_stack()) {
        global::teardown();
        return;
    }

    build_garbage(8);
    scrub_stack();

    let stats = global::collect();
    assert_eq!(stats.chunks_reclaimed, 8);
    assert!(global::dump(ListKind::Allocated).starts_with("Allocated Chunks (0):"));
    global::teardown();
}

#[test]
#[should_panic(expected = "no stack root bound")]
fn test_global_collect_without_bound_panics() {
    global::init(HeapConfig::new().capacity_words(16)).unwrap();
    global::collect();
}
