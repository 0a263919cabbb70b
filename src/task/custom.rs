use crate::foundation::error::FrameloomResult;
use crate::task::cancel::CancelToken;
use crate::task::hardware::{Hardware, HardwareSupport};
use crate::task::task::{Affinity, CancelReason, Progress, Task};

type BeforeFn = Box<dyn FnOnce(Hardware) + Send>;
type RunFn = Box<dyn FnOnce(&CancelToken) -> FrameloomResult<()> + Send>;
type AfterFn = Box<dyn FnOnce() + Send>;
type CanceledFn = Box<dyn FnOnce(&CancelReason) + Send>;

/// Single-stage task built from four independent callbacks.
///
/// `run` executes on a worker; the other three on the scheduler's thread. Missing
/// callbacks are no-ops.
pub struct CustomTask {
    name: String,
    affinity: Affinity,
    before: Option<BeforeFn>,
    run: Option<RunFn>,
    after: Option<AfterFn>,
    canceled: Option<CanceledFn>,
}

impl CustomTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affinity: Affinity::Compute(HardwareSupport::CpuOnly),
            before: None,
            run: None,
            after: None,
            canceled: None,
        }
    }

    pub fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    pub fn before(mut self, f: impl FnOnce(Hardware) + Send + 'static) -> Self {
        self.before = Some(Box::new(f));
        self
    }

    pub fn run(mut self, f: impl FnOnce(&CancelToken) -> FrameloomResult<()> + Send + 'static) -> Self {
        self.run = Some(Box::new(f));
        self
    }

    pub fn after(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.after = Some(Box::new(f));
        self
    }

    pub fn canceled(mut self, f: impl FnOnce(&CancelReason) + Send + 'static) -> Self {
        self.canceled = Some(Box::new(f));
        self
    }

    /// Task whose only job is to drop `value` on a worker thread.
    pub fn disposer<T: Send + 'static>(value: T) -> Self {
        Self::new("dispose").run(move |_| {
            drop(value);
            Ok(())
        })
    }
}

impl Task for CustomTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn affinity(&self) -> Affinity {
        self.affinity
    }

    fn before_processing(&mut self, hardware: Hardware) {
        if let Some(f) = self.before.take() {
            f(hardware);
        }
    }

    fn process_cpu(&mut self, cancel: &CancelToken) -> FrameloomResult<Progress> {
        cancel.checkpoint()?;
        if let Some(f) = self.run.take() {
            f(cancel)?;
        }
        Ok(Progress::Finished)
    }

    fn after_processing(&mut self) {
        if let Some(f) = self.after.take() {
            f();
        }
    }

    fn after_canceled(&mut self, reason: &CancelReason) {
        if let Some(f) = self.canceled.take() {
            f(reason);
        }
    }
}
