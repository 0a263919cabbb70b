use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::cache::memory::{MemoryReport, MemoryState};
use crate::foundation::core::FrameRange;
use crate::render::image::RasterImage;

/// Rendered frame held by the cache.
#[derive(Clone, Debug)]
pub struct CachedFrame {
    pub image: Arc<RasterImage>,
    /// Resolution fraction the frame was rendered at.
    pub resolution: f64,
    /// Frames that would render to the same image.
    pub identical_range: FrameRange,
    blocked: bool,
    /// Invalidated while blocked; dropped as soon as it is unblocked.
    stale: bool,
}

impl CachedFrame {
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn byte_len(&self) -> usize {
        self.image.byte_len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub blocked: usize,
    pub stale: usize,
}

/// Rendered frames keyed by frame number, evicted least-recently-displayed first.
///
/// Recency is bumped by [`FrameCache::insert`] and [`FrameCache::mark_displayed`]. Blocked
/// entries are skipped by every eviction path; only [`FrameCache::clear`] drops them.
#[derive(Debug, Default)]
pub struct FrameCache {
    entries: BTreeMap<i64, CachedFrame>,
    /// Front is the least recently used frame.
    recency: IndexSet<i64>,
    bytes: usize,
    budget: Option<usize>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose [`FrameCache::trim_to_budget`] keeps at most `bytes` of unblocked frames.
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn contains(&self, frame: i64) -> bool {
        self.entries.contains_key(&frame)
    }

    /// Store a rendered frame, replacing any entry for the same frame.
    ///
    /// A replaced entry keeps its blocked flag.
    pub fn insert(
        &mut self,
        frame: i64,
        image: Arc<RasterImage>,
        resolution: f64,
        identical_range: FrameRange,
    ) {
        let blocked = self.entries.get(&frame).is_some_and(|e| e.blocked);
        let entry = CachedFrame {
            image,
            resolution,
            identical_range: identical_range.union(FrameRange::single(frame)),
            blocked,
            stale: false,
        };
        self.bytes += entry.byte_len();
        if let Some(old) = self.entries.insert(frame, entry) {
            self.bytes -= old.byte_len();
        }
        self.touch(frame);
    }

    /// Entry serving `frame`: its own, or any entry whose identical range covers it.
    pub fn get(&self, frame: i64) -> Option<&CachedFrame> {
        self.lookup(frame).map(|(_, e)| e)
    }

    /// Like [`FrameCache::get`], also returning the frame the entry is stored under.
    pub fn lookup(&self, frame: i64) -> Option<(i64, &CachedFrame)> {
        if let Some(e) = self.entries.get(&frame) {
            return (!e.stale).then_some((frame, e));
        }
        self.entries
            .iter()
            .find(|(_, e)| !e.stale && e.identical_range.contains(frame))
            .map(|(f, e)| (*f, e))
    }

    /// Record that `frame` was shown, making it the most recently used entry.
    pub fn mark_displayed(&mut self, frame: i64) {
        if self.entries.contains_key(&frame) {
            self.touch(frame);
        }
    }

    fn touch(&mut self, frame: i64) {
        self.recency.shift_remove(&frame);
        self.recency.insert(frame);
    }

    /// Pin or unpin a frame. Unpinning a stale frame drops it. Returns whether it exists.
    pub fn set_blocked(&mut self, frame: i64, blocked: bool) -> bool {
        let Some(e) = self.entries.get_mut(&frame) else {
            return false;
        };
        e.blocked = blocked;
        if !blocked && e.stale {
            self.remove(frame);
        }
        true
    }

    pub fn remove(&mut self, frame: i64) -> Option<CachedFrame> {
        let e = self.entries.remove(&frame)?;
        self.recency.shift_remove(&frame);
        self.bytes -= e.byte_len();
        Some(e)
    }

    /// Drop frames whose identical range overlaps `range`; blocked ones are marked stale.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_range(&mut self, range: FrameRange) -> usize {
        let hit: Vec<i64> = self
            .entries
            .iter()
            .filter(|(_, e)| e.identical_range.overlaps(range))
            .map(|(f, _)| *f)
            .collect();
        let mut removed = 0;
        for frame in hit {
            let Some(e) = self.entries.get_mut(&frame) else {
                continue;
            };
            if e.blocked {
                e.stale = true;
            } else {
                self.remove(frame);
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(?range, removed, "frame cache invalidated");
        }
        removed
    }

    /// Evict unblocked frames, least recently used first, until at least `target` bytes
    /// were released or nothing evictable is left. Returns the bytes released.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn evict_bytes(&mut self, target: usize) -> usize {
        let mut freed = 0;
        while freed < target {
            let Some(frame) = self.next_victim() else {
                break;
            };
            if let Some(e) = self.remove(frame) {
                freed += e.byte_len();
            }
        }
        freed
    }

    /// Evict up to `count` unblocked frames. Returns the number evicted.
    pub fn evict_count(&mut self, count: usize) -> usize {
        let mut evicted = 0;
        while evicted < count {
            let Some(frame) = self.next_victim() else {
                break;
            };
            self.remove(frame);
            evicted += 1;
        }
        evicted
    }

    fn next_victim(&self) -> Option<i64> {
        self.recency
            .iter()
            .copied()
            .find(|f| self.entries.get(f).is_some_and(|e| !e.blocked))
    }

    /// Release memory for a pressure report: the requested bytes, and everything evictable
    /// when the state is critical.
    pub fn handle_memory_state(&mut self, report: &MemoryReport) -> usize {
        match report.state {
            MemoryState::Normal => 0,
            MemoryState::Critical => self.evict_bytes(usize::MAX),
            MemoryState::Low | MemoryState::VeryLow => {
                self.evict_bytes(usize::try_from(report.to_free).unwrap_or(usize::MAX))
            }
        }
    }

    /// Evict down to the configured budget. Returns the bytes released.
    pub fn trim_to_budget(&mut self) -> usize {
        match self.budget {
            Some(budget) if self.bytes > budget => self.evict_bytes(self.bytes - budget),
            _ => 0,
        }
    }

    /// Drop everything, blocked or not.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.bytes = 0;
    }

    pub fn frames(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.keys().copied()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            bytes: self.bytes,
            blocked: self.entries.values().filter(|e| e.blocked).count(),
            stale: self.entries.values().filter(|e| e.stale).count(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/frame_cache.rs"]
mod tests;
