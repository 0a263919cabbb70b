//! Render-data snapshots, rasterization and the tasks that render them.

/// Immutable render snapshots.
pub mod data;
/// Premultiplied RGBA8 images.
pub mod image;
/// CPU rasterization of snapshots.
pub mod raster;
/// Scene-to-snapshot setup and frame planning.
pub mod setup;
/// Scheduler tasks rendering a frame plan.
pub mod task;
