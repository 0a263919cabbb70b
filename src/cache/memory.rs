use sysinfo::System;

/// Memory pressure level, from least to most severe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryState {
    #[default]
    Normal,
    Low,
    VeryLow,
    Critical,
}

/// One memory check: the pressure level and how many bytes should be released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryReport {
    pub state: MemoryState,
    pub to_free: u64,
    pub total: u64,
    pub available: u64,
}

/// Free-memory thresholds as a share of total RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryThresholds {
    pub low: u64,
    pub very_low: u64,
    pub critical: u64,
}

impl MemoryThresholds {
    /// 20 / 15 / 10 percent of `total` bytes.
    pub fn for_total(total: u64) -> Self {
        Self {
            low: total / 100 * 20,
            very_low: total / 100 * 15,
            critical: total / 100 * 10,
        }
    }
}

/// Classify a memory reading.
///
/// System pressure wins. Otherwise exceeding `cap` (bytes, 0 = no cap) with `used` bytes
/// reports [`MemoryState::Low`] asking for the overshoot back.
pub fn classify(total: u64, available: u64, used: u64, cap: u64) -> MemoryReport {
    let th = MemoryThresholds::for_total(total);
    let (state, to_free) = if available < th.low {
        let to_free = th.low - available;
        let state = if available < th.critical {
            MemoryState::Critical
        } else if available < th.very_low {
            MemoryState::VeryLow
        } else {
            MemoryState::Low
        };
        (state, to_free)
    } else if cap > 0 && used > cap {
        (MemoryState::Low, used - cap)
    } else {
        (MemoryState::Normal, 0)
    };
    MemoryReport {
        state,
        to_free,
        total,
        available,
    }
}

/// Polls system RAM through `sysinfo`.
pub struct MemoryChecker {
    system: System,
    cap_bytes: u64,
    last: MemoryState,
}

impl MemoryChecker {
    /// `ram_mb_cap <= 0` disables the process cap.
    pub fn new(ram_mb_cap: i64) -> Self {
        let cap_bytes = u64::try_from(ram_mb_cap)
            .unwrap_or(0)
            .saturating_mul(1024 * 1024);
        Self {
            system: System::new(),
            cap_bytes,
            last: MemoryState::Normal,
        }
    }

    pub fn last_state(&self) -> MemoryState {
        self.last
    }

    /// Refresh RAM counters and classify them; `used` is what the caller holds in caches.
    pub fn check(&mut self, used: u64) -> MemoryReport {
        self.system.refresh_memory();
        let report = classify(
            self.system.total_memory(),
            self.system.available_memory(),
            used,
            self.cap_bytes,
        );
        if report.state != self.last {
            tracing::debug!(state = ?report.state, to_free = report.to_free, "memory state changed");
        }
        self.last = report.state;
        report
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/memory.rs"]
mod tests;
