//! Shared primitives used by every other module.

/// Frame ranges, pixel rectangles, colors and re-exported geometry types.
pub mod core;
/// Crate error type.
pub mod error;
pub(crate) mod math;
