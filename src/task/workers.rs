use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::gpu::context::GpuContext;
use crate::task::cancel::CancelToken;
use crate::task::hardware::Hardware;
use crate::task::scheduler::TaskId;
use crate::task::task::{Progress, Task};

pub(crate) struct Job {
    pub id: TaskId,
    pub task: Box<dyn Task>,
    pub cancel: CancelToken,
    pub hardware: Hardware,
}

/// `Err` carries a panic message.
pub(crate) type JobResult = Result<FrameloomResult<Progress>, String>;

pub(crate) struct Done {
    pub id: TaskId,
    pub task: Box<dyn Task>,
    pub hardware: Hardware,
    pub result: JobResult,
}

/// CPU workers, one disk worker and an optional GPU thread owning the device.
pub(crate) struct WorkerPool {
    cpu_tx: Option<Sender<Job>>,
    hdd_tx: Option<Sender<Job>>,
    gpu_tx: Option<Sender<Job>>,
    done_rx: Receiver<Done>,
    threads: Vec<JoinHandle<()>>,
    cpu_workers: usize,
}

impl WorkerPool {
    pub fn new(cpu_workers: usize, gpu: Option<Box<dyn GpuContext>>) -> FrameloomResult<Self> {
        let cpu_workers = cpu_workers.max(1);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Done>();
        let mut threads = Vec::with_capacity(cpu_workers + 2);

        let (cpu_tx, cpu_rx) = crossbeam_channel::unbounded::<Job>();
        for i in 0..cpu_workers {
            let rx = cpu_rx.clone();
            let tx = done_tx.clone();
            threads.push(spawn(format!("frameloom-cpu-{i}"), move || {
                run_cpu_worker(&rx, &tx)
            })?);
        }

        let (hdd_tx, hdd_rx) = crossbeam_channel::unbounded::<Job>();
        {
            let tx = done_tx.clone();
            threads.push(spawn("frameloom-hdd".to_string(), move || {
                run_cpu_worker(&hdd_rx, &tx)
            })?);
        }

        let gpu_tx = match gpu {
            Some(mut gpu) => {
                let (gpu_tx, gpu_rx) = crossbeam_channel::unbounded::<Job>();
                let tx = done_tx.clone();
                threads.push(spawn("frameloom-gpu".to_string(), move || {
                    for job in gpu_rx.iter() {
                        let Job {
                            id,
                            mut task,
                            cancel,
                            hardware,
                        } = job;
                        let result = catch_unwind(AssertUnwindSafe(|| {
                            task.process_gpu(gpu.as_mut(), &cancel)
                        }))
                        .map_err(panic_message);
                        let done = Done {
                            id,
                            task,
                            hardware,
                            result,
                        };
                        if tx.send(done).is_err() {
                            break;
                        }
                    }
                })?);
                Some(gpu_tx)
            }
            None => None,
        };

        Ok(Self {
            cpu_tx: Some(cpu_tx),
            hdd_tx: Some(hdd_tx),
            gpu_tx,
            done_rx,
            threads,
            cpu_workers,
        })
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu_tx.is_some()
    }

    /// Jobs that can run at once on `hardware`.
    pub fn capacity(&self, hardware: Hardware) -> usize {
        match hardware {
            Hardware::Cpu => self.cpu_workers,
            Hardware::Hdd => 1,
            Hardware::Gpu => usize::from(self.has_gpu()),
        }
    }

    /// Hand a job to its worker; gives the job back if no worker can take it.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        let tx = match job.hardware {
            Hardware::Cpu => self.cpu_tx.as_ref(),
            Hardware::Hdd => self.hdd_tx.as_ref(),
            Hardware::Gpu => self.gpu_tx.as_ref(),
        };
        match tx {
            Some(tx) => tx.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    pub fn try_recv(&self) -> Option<Done> {
        self.done_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Done> {
        match self.done_rx.recv_timeout(timeout) {
            Ok(done) => Some(done),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cpu_tx = None;
        self.hdd_tx = None;
        self.gpu_tx = None;
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked during shutdown");
            }
        }
    }
}

fn spawn(name: String, f: impl FnOnce() + Send + 'static) -> FrameloomResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|e| FrameloomError::resource(format!("spawn worker '{name}': {e}")))
}

fn run_cpu_worker(rx: &Receiver<Job>, tx: &Sender<Done>) {
    for job in rx.iter() {
        let Job {
            id,
            mut task,
            cancel,
            hardware,
        } = job;
        let result =
            catch_unwind(AssertUnwindSafe(|| task.process_cpu(&cancel))).map_err(panic_message);
        let done = Done {
            id,
            task,
            hardware,
            result,
        };
        if tx.send(done).is_err() {
            break;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
