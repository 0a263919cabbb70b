/// Animator-backed effect parameters.
pub mod animated;
/// Blend modes and premultiplied compositing.
pub mod blend;
/// Evaluated raster effects.
pub mod effect;
/// CPU pixel kernels.
pub mod kernels;
/// Ordered CPU/GPU effect pipeline.
pub mod renderer;
