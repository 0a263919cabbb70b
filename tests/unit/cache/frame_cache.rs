use super::*;

fn img() -> Arc<RasterImage> {
    Arc::new(RasterImage::filled(4, 4, [1, 2, 3, 255]))
}

fn filled(frames: &[i64]) -> FrameCache {
    let mut cache = FrameCache::new();
    for &f in frames {
        cache.insert(f, img(), 1.0, FrameRange::single(f));
    }
    cache
}

#[test]
fn eviction_skips_blocked_and_follows_display_order() {
    let mut cache = filled(&[1, 2, 3]);
    cache.set_blocked(2, true);
    cache.mark_displayed(1);
    cache.mark_displayed(3);

    assert_eq!(cache.evict_count(1), 1);
    assert!(!cache.contains(1));
    assert!(cache.contains(2) && cache.contains(3));

    assert_eq!(cache.evict_count(5), 1);
    assert_eq!(cache.frames().collect::<Vec<_>>(), [2]);

    cache.set_blocked(2, false);
    assert_eq!(cache.evict_count(1), 1);
    assert!(cache.is_empty());
}

#[test]
fn evict_bytes_releases_at_least_target() {
    let mut cache = filled(&[1, 2, 3]);
    assert_eq!(cache.bytes(), 3 * 64);
    assert_eq!(cache.evict_bytes(65), 128);
    assert_eq!(cache.frames().collect::<Vec<_>>(), [3]);
    assert_eq!(cache.bytes(), 64);
}

#[test]
fn insert_replaces_and_keeps_pin() {
    let mut cache = filled(&[1]);
    cache.set_blocked(1, true);
    let replacement = Arc::new(RasterImage::filled(2, 2, [0, 0, 0, 255]));
    cache.insert(1, Arc::clone(&replacement), 0.5, FrameRange::single(1));
    let e = cache.get(1).unwrap();
    assert!(Arc::ptr_eq(&e.image, &replacement));
    assert!(e.is_blocked());
    assert_eq!(e.resolution, 0.5);
    assert_eq!(cache.bytes(), 16);
}

#[test]
fn lookup_through_identical_range() {
    let mut cache = FrameCache::new();
    cache.insert(10, img(), 1.0, FrameRange::new(5, 20));
    assert!(cache.get(15).is_some());
    assert!(cache.get(21).is_none());
}

#[test]
fn invalidation_marks_blocked_frames_stale() {
    let mut cache = filled(&[1, 2, 3]);
    cache.set_blocked(2, true);
    assert_eq!(cache.invalidate_range(FrameRange::new(2, 3)), 1);
    assert!(cache.contains(2) && !cache.contains(3));
    assert!(cache.get(2).is_none());
    assert_eq!(cache.stats().stale, 1);

    cache.set_blocked(2, false);
    assert!(!cache.contains(2));
    assert_eq!(cache.frames().collect::<Vec<_>>(), [1]);
}

#[test]
fn memory_pressure_and_budget() {
    let mut cache = filled(&[1, 2, 3]);
    cache.set_blocked(3, true);
    let report = MemoryReport {
        state: MemoryState::Critical,
        to_free: 1,
        total: 0,
        available: 0,
    };
    assert_eq!(cache.handle_memory_state(&report), 128);
    assert_eq!(cache.len(), 1);

    let mut cache = FrameCache::with_budget(100);
    for f in 0..4 {
        cache.insert(f, img(), 1.0, FrameRange::single(f));
    }
    cache.trim_to_budget();
    assert!(cache.bytes() <= 100);
    assert!(cache.contains(3));
}

#[test]
fn clear_drops_blocked_entries() {
    let mut cache = filled(&[1, 2]);
    cache.set_blocked(1, true);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats(), CacheStats::default());
}

#[test]
fn lookup_reports_storing_frame() {
    let mut cache = FrameCache::new();
    cache.insert(4, img(), 1.0, FrameRange::new(0, 9));
    assert_eq!(cache.lookup(7).map(|(f, _)| f), Some(4));
    cache.mark_displayed(4);
    assert_eq!(cache.lookup(12).map(|(f, _)| f), None);
}
