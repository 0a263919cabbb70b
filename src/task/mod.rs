/// Cooperative cancellation flag.
pub mod cancel;
/// Closure-built tasks and the disposer.
pub mod custom;
/// Image loading on the disk worker.
pub mod disk;
/// Hardware tags and placement.
pub mod hardware;
/// The scheduler.
pub mod scheduler;
/// Task trait and lifecycle types.
#[allow(clippy::module_inception)]
pub mod task;
pub(crate) mod workers;
