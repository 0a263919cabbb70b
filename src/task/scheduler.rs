use std::collections::VecDeque;
use std::time::{Duration, Instant};

use slotmap::SlotMap;

use crate::foundation::error::FrameloomResult;
use crate::gpu::context::GpuContext;
use crate::task::cancel::CancelToken;
use crate::task::hardware::{AccPreference, Hardware, HardwareResolver, QueueLoad};
use crate::task::task::{Affinity, CancelReason, Progress, Task, TaskOutcome, TaskState};
use crate::task::workers::{Done, Job, WorkerPool};

/// Canceled ids remembered so late dependents still see the cancellation.
const RECENT_CANCELED: usize = 1024;

slotmap::new_key_type! {
    /// Handle to a scheduled task; stale once the task was disposed.
    pub struct TaskId;
}

/// When a dependent fires relative to its dependency's outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependentPolicy {
    /// Only after the dependency finished; a canceled dependency cancels the dependent.
    OnSuccess,
    /// After the dependency finished or was canceled.
    Always,
}

type Callback = Box<dyn FnOnce(&TaskOutcome) + Send>;

enum Dependent {
    Task(TaskId),
    Callback(Callback),
}

struct Entry {
    name: String,
    /// `None` while a worker owns the task.
    task: Option<Box<dyn Task>>,
    state: TaskState,
    cancel: CancelToken,
    cancel_reason: Option<CancelReason>,
    unmet: usize,
    dependents: Vec<(DependentPolicy, Dependent)>,
    queue: Option<Hardware>,
}

/// Counters since construction, plus current queue sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub finished: u64,
    pub canceled: u64,
    /// Canceled because `process` returned an error.
    pub failed: u64,
    /// Canceled because `process` panicked.
    pub panicked: u64,
    pub queued: usize,
    pub running: usize,
}

/// Cooperative scheduler for CPU, disk and GPU work with dependency edges.
///
/// The owning thread calls [`Scheduler::pump`] (or [`Scheduler::wait_idle`]) to dispatch
/// queued work and to run completion hooks. Queues are FIFO per hardware; tasks whose
/// dependencies are unmet are skipped until they become ready.
pub struct Scheduler {
    entries: SlotMap<TaskId, Entry>,
    cpu_queue: VecDeque<TaskId>,
    hdd_queue: VecDeque<TaskId>,
    gpu_queue: VecDeque<TaskId>,
    busy_cpu: usize,
    busy_hdd: usize,
    busy_gpu: usize,
    resolver: HardwareResolver,
    pool: WorkerPool,
    stats: SchedulerStats,
    recent_canceled: VecDeque<TaskId>,
}

impl Scheduler {
    /// Spawn `cpu_threads` CPU workers, one disk worker and, when `gpu` is given, a GPU
    /// thread that owns it.
    pub fn new(
        cpu_threads: usize,
        preference: AccPreference,
        gpu: Option<Box<dyn GpuContext>>,
    ) -> FrameloomResult<Self> {
        let pool = WorkerPool::new(cpu_threads, gpu)?;
        tracing::debug!(
            cpu_threads = pool.capacity(Hardware::Cpu),
            gpu = pool.has_gpu(),
            "scheduler started"
        );
        Ok(Self {
            entries: SlotMap::with_key(),
            cpu_queue: VecDeque::new(),
            hdd_queue: VecDeque::new(),
            gpu_queue: VecDeque::new(),
            busy_cpu: 0,
            busy_hdd: 0,
            busy_gpu: 0,
            resolver: HardwareResolver::new(preference, pool.has_gpu()),
            pool,
            stats: SchedulerStats::default(),
            recent_canceled: VecDeque::new(),
        })
    }

    pub fn resolver(&self) -> HardwareResolver {
        self.resolver
    }

    pub fn has_gpu(&self) -> bool {
        self.pool.has_gpu()
    }

    /// Queue a task with no dependencies.
    pub fn schedule(&mut self, task: Box<dyn Task>) -> TaskId {
        self.schedule_with_deps(task, &[], DependentPolicy::OnSuccess)
    }

    /// Queue a task that waits for every task in `deps`.
    ///
    /// Dependencies that already finished count as satisfied. Under
    /// [`DependentPolicy::OnSuccess`] a dependency that was recently canceled cancels the new
    /// task right away; ids older than the last [`RECENT_CANCELED`] cancellations are treated
    /// as finished.
    pub fn schedule_with_deps(
        &mut self,
        task: Box<dyn Task>,
        deps: &[TaskId],
        policy: DependentPolicy,
    ) -> TaskId {
        let id = self.entries.insert(Entry {
            name: task.name().to_string(),
            task: Some(task),
            state: TaskState::Queued,
            cancel: CancelToken::new(),
            cancel_reason: None,
            unmet: 0,
            dependents: Vec::new(),
            queue: None,
        });
        self.stats.scheduled += 1;
        let mut dep_canceled = false;
        for &dep in deps {
            if let Some(d) = self.entries.get_mut(dep) {
                d.dependents.push((policy, Dependent::Task(id)));
                if let Some(e) = self.entries.get_mut(id) {
                    e.unmet += 1;
                }
            } else if policy == DependentPolicy::OnSuccess && self.recent_canceled.contains(&dep) {
                dep_canceled = true;
            }
        }
        if dep_canceled {
            self.cancel_with(id, CancelReason::DependencyCanceled);
        } else {
            self.enqueue(id);
        }
        id
    }

    /// Run `callback` on this thread once `id` completes, subject to `policy`.
    ///
    /// Returns `false` when `id` is unknown (already disposed); the callback is dropped.
    pub fn on_finished(
        &mut self,
        id: TaskId,
        policy: DependentPolicy,
        callback: impl FnOnce(&TaskOutcome) + Send + 'static,
    ) -> bool {
        match self.entries.get_mut(id) {
            Some(e) => {
                e.dependents
                    .push((policy, Dependent::Callback(Box::new(callback))));
                true
            }
            None => false,
        }
    }

    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.entries.get(id).map(|e| e.state)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_idle(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.cpu_queue.len() + self.hdd_queue.len() + self.gpu_queue.len(),
            running: self.busy_cpu + self.busy_hdd + self.busy_gpu,
            ..self.stats
        }
    }

    /// Request cancellation.
    ///
    /// Queued tasks are canceled right away. Running tasks are flagged and end at their next
    /// checkpoint; whatever they return is then treated as canceled.
    pub fn cancel(&mut self, id: TaskId) {
        self.cancel_with(id, CancelReason::Requested);
    }

    fn cancel_with(&mut self, id: TaskId, reason: CancelReason) {
        let Some(e) = self.entries.get_mut(id) else {
            return;
        };
        e.cancel.cancel();
        match e.state {
            TaskState::Processing => {
                e.cancel_reason.get_or_insert(reason);
            }
            TaskState::Queued => {
                if let Some(hw) = e.queue.take() {
                    self.queue_mut(hw).retain(|q| *q != id);
                }
                self.complete(id, TaskOutcome::Canceled(reason));
            }
        }
    }

    /// Collect finished work, run completion hooks and dispatch ready tasks.
    ///
    /// Returns the number of completions handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(done) = self.pool.try_recv() {
            self.handle_done(done);
            handled += 1;
        }
        self.dispatch();
        handled
    }

    /// Pump until no task is left or `timeout` elapses. Returns whether the scheduler is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.entries.is_empty() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if let Some(done) = self.pool.recv_timeout(deadline - now) {
                self.handle_done(done);
            }
        }
    }

    fn queue_mut(&mut self, hardware: Hardware) -> &mut VecDeque<TaskId> {
        match hardware {
            Hardware::Cpu => &mut self.cpu_queue,
            Hardware::Hdd => &mut self.hdd_queue,
            Hardware::Gpu => &mut self.gpu_queue,
        }
    }

    fn busy_mut(&mut self, hardware: Hardware) -> &mut usize {
        match hardware {
            Hardware::Cpu => &mut self.busy_cpu,
            Hardware::Hdd => &mut self.busy_hdd,
            Hardware::Gpu => &mut self.busy_gpu,
        }
    }

    fn load(&self) -> QueueLoad {
        QueueLoad {
            cpu: self.cpu_queue.len() + self.busy_cpu,
            gpu: self.gpu_queue.len() + self.busy_gpu,
        }
    }

    /// Place a task on the queue matching its current affinity.
    fn enqueue(&mut self, id: TaskId) {
        let Some(affinity) = self
            .entries
            .get(id)
            .and_then(|e| e.task.as_ref())
            .map(|t| t.affinity())
        else {
            return;
        };
        let hardware = match affinity {
            Affinity::Disk => Some(Hardware::Hdd),
            Affinity::Compute(support) => self.resolver.resolve_with_load(support, self.load()),
        };
        let Some(hardware) = hardware else {
            tracing::warn!(task = ?id, "no hardware can run task");
            self.complete(id, TaskOutcome::Canceled(CancelReason::NoHardware));
            return;
        };
        if let Some(e) = self.entries.get_mut(id) {
            e.state = TaskState::Queued;
            e.queue = Some(hardware);
        }
        self.queue_mut(hardware).push_back(id);
    }

    fn dispatch(&mut self) {
        for hardware in [Hardware::Cpu, Hardware::Hdd, Hardware::Gpu] {
            while *self.busy_mut(hardware) < self.pool.capacity(hardware) {
                let entries = &self.entries;
                let queue = match hardware {
                    Hardware::Cpu => &self.cpu_queue,
                    Hardware::Hdd => &self.hdd_queue,
                    Hardware::Gpu => &self.gpu_queue,
                };
                let Some(pos) = queue
                    .iter()
                    .position(|id| entries.get(*id).is_some_and(|e| e.unmet == 0))
                else {
                    break;
                };
                let Some(id) = self.queue_mut(hardware).remove(pos) else {
                    break;
                };
                self.start(id, hardware);
            }
        }
    }

    fn start(&mut self, id: TaskId, hardware: Hardware) {
        let Some(e) = self.entries.get_mut(id) else {
            return;
        };
        let Some(mut task) = e.task.take() else {
            return;
        };
        e.state = TaskState::Processing;
        e.queue = None;
        task.before_processing(hardware);
        tracing::debug!(task = %e.name, ?hardware, "dispatch");
        let job = Job {
            id,
            task,
            cancel: e.cancel.clone(),
            hardware,
        };
        match self.pool.submit(job) {
            Ok(()) => *self.busy_mut(hardware) += 1,
            Err(job) => {
                if let Some(e) = self.entries.get_mut(id) {
                    e.task = Some(job.task);
                }
                let reason = CancelReason::Failed("worker unavailable".to_string());
                self.complete(id, TaskOutcome::Canceled(reason));
            }
        }
    }

    fn handle_done(&mut self, done: Done) {
        let busy = self.busy_mut(done.hardware);
        *busy = busy.saturating_sub(1);
        let Some(e) = self.entries.get_mut(done.id) else {
            return;
        };
        e.task = Some(done.task);
        let flagged = e.cancel.is_canceled();
        let outcome = match done.result {
            Ok(Ok(_)) | Ok(Err(_)) if flagged => TaskOutcome::Canceled(
                e.cancel_reason.take().unwrap_or(CancelReason::Requested),
            ),
            Ok(Ok(Progress::Continue)) => {
                self.enqueue(done.id);
                return;
            }
            Ok(Ok(Progress::Finished)) => TaskOutcome::Finished,
            Ok(Err(err)) if err.is_canceled() => TaskOutcome::Canceled(CancelReason::Requested),
            Ok(Err(err)) => {
                tracing::warn!(task = %e.name, error = %err, "task failed");
                self.stats.failed += 1;
                TaskOutcome::Canceled(CancelReason::Failed(err.to_string()))
            }
            Err(panic) => {
                tracing::warn!(task = %e.name, panic = %panic, "task panicked");
                self.stats.panicked += 1;
                TaskOutcome::Canceled(CancelReason::Failed(format!("panicked: {panic}")))
            }
        };
        self.complete(done.id, outcome);
    }

    /// Run the completion hook, dispose the task and fire its dependents.
    fn complete(&mut self, id: TaskId, outcome: TaskOutcome) {
        let Some(mut entry) = self.entries.remove(id) else {
            return;
        };
        if let Some(mut task) = entry.task.take() {
            match &outcome {
                TaskOutcome::Finished => task.after_processing(),
                TaskOutcome::Canceled(reason) => task.after_canceled(reason),
            }
        }
        match &outcome {
            TaskOutcome::Finished => {
                self.stats.finished += 1;
                tracing::debug!(task = %entry.name, "finished");
            }
            TaskOutcome::Canceled(reason) => {
                self.stats.canceled += 1;
                tracing::debug!(task = %entry.name, ?reason, "canceled");
            }
        }

        let finished = outcome.is_finished();
        if !finished {
            self.recent_canceled.push_back(id);
            if self.recent_canceled.len() > RECENT_CANCELED {
                self.recent_canceled.pop_front();
            }
        }
        for (policy, dependent) in entry.dependents {
            let fire = finished || policy == DependentPolicy::Always;
            match dependent {
                Dependent::Task(dep) if fire => {
                    if let Some(d) = self.entries.get_mut(dep) {
                        d.unmet = d.unmet.saturating_sub(1);
                    }
                }
                Dependent::Task(dep) => self.cancel_with(dep, CancelReason::DependencyCanceled),
                Dependent::Callback(callback) if fire => callback(&outcome),
                Dependent::Callback(_) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/scheduler.rs"]
mod tests;
