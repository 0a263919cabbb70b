//! Rendered-frame cache and memory pressure detection.

/// Frame cache with pinning and recency-based eviction.
pub mod frame_cache;
pub mod memory;
