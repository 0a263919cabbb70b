/// `GpuContext` trait, texture handles and ping-pong tools.
pub mod context;
/// CPU-backed implementation of [`context::GpuContext`].
pub mod software;
