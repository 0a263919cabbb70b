use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::gpu::context::GpuContext;
use crate::task::cancel::CancelToken;
use crate::task::hardware::{Hardware, HardwareSupport};

/// Which queue a task (or its next stage) belongs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affinity {
    /// The single disk worker.
    Disk,
    /// CPU workers and/or the GPU thread, resolved with the acceleration preference.
    Compute(HardwareSupport),
}

/// Result of one `process` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Finished,
    /// Another stage is pending; the task is queued again using its new [`Affinity`].
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting in a queue, possibly for dependencies.
    Queued,
    /// Owned by a worker.
    Processing,
}

/// Why a task ended without finishing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// Explicit cancel request, or `process` stopped at a checkpoint.
    Requested,
    /// `process` returned an error or panicked.
    Failed(String),
    /// A dependency this task needed to succeed was canceled.
    DependencyCanceled,
    /// The task needs hardware that is not available.
    NoHardware,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Finished,
    Canceled(CancelReason),
}

impl TaskOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Unit of scheduled work.
///
/// `before_processing`, `after_processing` and `after_canceled` run on the thread that owns
/// the [`crate::task::scheduler::Scheduler`]. `process_*` runs on a worker that owns the
/// task for the duration of the call, so one task is never touched by two threads at once.
pub trait Task: Send {
    fn name(&self) -> &str {
        "task"
    }

    fn affinity(&self) -> Affinity;

    /// Called right before each dispatch with the chosen hardware.
    fn before_processing(&mut self, _hardware: Hardware) {}

    /// One stage on a CPU or disk worker.
    fn process_cpu(&mut self, cancel: &CancelToken) -> FrameloomResult<Progress>;

    /// One stage inside the GPU thread.
    fn process_gpu(
        &mut self,
        _gpu: &mut dyn GpuContext,
        _cancel: &CancelToken,
    ) -> FrameloomResult<Progress> {
        Err(FrameloomError::resource(format!(
            "task '{}' has no gpu stage",
            self.name()
        )))
    }

    fn after_processing(&mut self) {}

    fn after_canceled(&mut self, _reason: &CancelReason) {}
}
