use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::foundation::error::FrameloomError;
use crate::gpu::software::SoftwareGpu;
use crate::task::custom::CustomTask;
use crate::task::hardware::HardwareSupport;

const WAIT: Duration = Duration::from_secs(10);

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Log, s: impl Into<String>) {
    log.lock().unwrap().push(s.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn recording(name: &'static str, log: &Log) -> CustomTask {
    let (run, after, canceled) = (log.clone(), log.clone(), log.clone());
    CustomTask::new(name)
        .run(move |_| {
            push(&run, format!("{name}:run"));
            Ok(())
        })
        .after(move || push(&after, format!("{name}:after")))
        .canceled(move |r| push(&canceled, format!("{name}:canceled:{r:?}")))
}

fn scheduler(threads: usize) -> Scheduler {
    Scheduler::new(threads, AccPreference::Default, None).unwrap()
}

#[test]
fn dependent_never_sees_unfinished_dependency() {
    let mut s = scheduler(4);
    let done = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(AtomicBool::new(false));

    let d = done.clone();
    let a = s.schedule(Box::new(CustomTask::new("a").run(move |_| {
        std::thread::sleep(Duration::from_millis(30));
        d.store(true, Ordering::SeqCst);
        Ok(())
    })));
    let (d, sn) = (done.clone(), seen.clone());
    s.schedule_with_deps(
        Box::new(CustomTask::new("b").run(move |_| {
            sn.store(d.load(Ordering::SeqCst), Ordering::SeqCst);
            Ok(())
        })),
        &[a],
        DependentPolicy::OnSuccess,
    );

    assert!(s.wait_idle(WAIT));
    assert!(seen.load(Ordering::SeqCst));
    assert_eq!(s.stats().finished, 2);
}

#[test]
fn canceled_dependency_skips_success_only_and_runs_always() {
    let mut s = scheduler(2);
    let log = log();
    let a = s.schedule(Box::new(recording("a", &log)));
    s.schedule_with_deps(Box::new(recording("b", &log)), &[a], DependentPolicy::OnSuccess);
    s.schedule_with_deps(Box::new(recording("cleanup", &log)), &[a], DependentPolicy::Always);
    let l = log.clone();
    s.on_finished(a, DependentPolicy::OnSuccess, move |_| push(&l, "cb:success"));
    let l = log.clone();
    s.on_finished(a, DependentPolicy::Always, move |o| push(&l, format!("cb:always:{o:?}")));

    s.cancel(a);
    assert!(s.wait_idle(WAIT));

    let got = entries(&log);
    assert!(got.contains(&"a:canceled:Requested".to_string()));
    assert!(got.contains(&"b:canceled:DependencyCanceled".to_string()));
    assert!(got.contains(&"cleanup:run".to_string()));
    assert!(got.contains(&"cleanup:after".to_string()));
    assert!(got.contains(&"cb:always:Canceled(Requested)".to_string()));
    assert!(!got.iter().any(|e| e == "a:run" || e == "b:run" || e == "cb:success"));
}

#[test]
fn errors_and_panics_become_failed_cancellations() {
    let mut s = scheduler(2);
    let log = log();
    let l = log.clone();
    s.schedule(Box::new(
        CustomTask::new("err")
            .run(|_| Err(FrameloomError::resource("disk gone")))
            .canceled(move |r| push(&l, format!("{r:?}"))),
    ));
    let l = log.clone();
    let boom = s.schedule(Box::new(
        CustomTask::new("boom")
            .run(|_| panic!("boom"))
            .canceled(move |r| push(&l, format!("{r:?}"))),
    ));
    s.schedule_with_deps(Box::new(recording("cleanup", &log)), &[boom], DependentPolicy::Always);

    assert!(s.wait_idle(WAIT));
    let got = entries(&log);
    assert!(got.contains(&"Failed(\"resource error: disk gone\")".to_string()));
    assert!(got.contains(&"Failed(\"panicked: boom\")".to_string()));
    assert!(got.contains(&"cleanup:run".to_string()));
    let stats = s.stats();
    assert_eq!((stats.failed, stats.panicked, stats.canceled), (1, 1, 2));
}

#[test]
fn running_task_stops_at_checkpoint() {
    let mut s = scheduler(1);
    let log = log();
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
    let (after, canceled) = (log.clone(), log.clone());
    let id = s.schedule(Box::new(
        CustomTask::new("spin")
            .run(move |cancel| {
                let _ = started_tx.send(());
                loop {
                    cancel.checkpoint()?;
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
            .after(move || push(&after, "after"))
            .canceled(move |r| push(&canceled, format!("{r:?}"))),
    ));
    s.pump();
    started_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(s.state(id), Some(TaskState::Processing));
    s.cancel(id);
    assert!(s.wait_idle(WAIT));
    assert_eq!(entries(&log), vec!["Requested".to_string()]);
}

#[test]
fn fifo_skips_tasks_with_unmet_dependencies() {
    let mut s = scheduler(1);
    let log = log();
    let gate = s.schedule(Box::new(
        CustomTask::new("gate")
            .with_affinity(Affinity::Disk)
            .run(|_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            }),
    ));
    s.schedule(Box::new(recording("a", &log)));
    s.schedule_with_deps(Box::new(recording("b", &log)), &[gate], DependentPolicy::OnSuccess);
    s.schedule(Box::new(recording("c", &log)));

    assert!(s.wait_idle(WAIT));
    let runs: Vec<String> = entries(&log)
        .into_iter()
        .filter(|e| e.ends_with(":run"))
        .collect();
    assert_eq!(runs, ["a:run", "c:run", "b:run"]);
}

#[test]
fn affinity_selects_queue() {
    let mut s = scheduler(2);
    let log = log();
    let l = log.clone();
    s.schedule(Box::new(
        CustomTask::new("disk")
            .with_affinity(Affinity::Disk)
            .before(move |hw| push(&l, format!("disk:{hw:?}"))),
    ));
    let l = log.clone();
    s.schedule(Box::new(
        CustomTask::new("cpu").before(move |hw| push(&l, format!("cpu:{hw:?}"))),
    ));
    let l = log.clone();
    s.schedule(Box::new(
        CustomTask::new("gpu")
            .with_affinity(Affinity::Compute(HardwareSupport::GpuOnly))
            .canceled(move |r| push(&l, format!("gpu:{r:?}"))),
    ));
    assert!(s.wait_idle(WAIT));
    let mut got = entries(&log);
    got.sort();
    assert_eq!(got, ["cpu:Cpu", "disk:Hdd", "gpu:NoHardware"]);
}

struct TwoStage {
    log: Log,
    stage: u8,
}

impl Task for TwoStage {
    fn affinity(&self) -> Affinity {
        if self.stage == 0 {
            Affinity::Compute(HardwareSupport::CpuOnly)
        } else {
            Affinity::Compute(HardwareSupport::GpuOnly)
        }
    }

    fn before_processing(&mut self, hardware: Hardware) {
        push(&self.log, format!("before:{hardware:?}"));
    }

    fn process_cpu(&mut self, _cancel: &CancelToken) -> FrameloomResult<Progress> {
        push(&self.log, "cpu");
        self.stage = 1;
        Ok(Progress::Continue)
    }

    fn process_gpu(
        &mut self,
        gpu: &mut dyn GpuContext,
        _cancel: &CancelToken,
    ) -> FrameloomResult<Progress> {
        push(&self.log, format!("gpu:{}", gpu.name()));
        Ok(Progress::Finished)
    }

    fn after_processing(&mut self) {
        push(&self.log, "after");
    }
}

#[test]
fn continued_task_moves_between_queues() {
    let mut s = Scheduler::new(1, AccPreference::Default, Some(Box::new(SoftwareGpu::new()))).unwrap();
    assert!(s.has_gpu());
    let log = log();
    s.schedule(Box::new(TwoStage {
        log: log.clone(),
        stage: 0,
    }));
    assert!(s.wait_idle(WAIT));
    assert_eq!(
        entries(&log),
        ["before:Cpu", "cpu", "before:Gpu", "gpu:software", "after"]
    );
}

#[test]
fn disposer_drops_value_on_worker() {
    let mut s = scheduler(1);
    let shared = Arc::new(vec![0u8; 1024]);
    s.schedule(Box::new(CustomTask::disposer(Arc::clone(&shared))));
    assert!(s.wait_idle(WAIT));
    assert_eq!(Arc::strong_count(&shared), 1);
}

#[test]
fn stale_ids_are_ignored() {
    let mut s = scheduler(1);
    let id = s.schedule(Box::new(CustomTask::new("x")));
    assert!(s.wait_idle(WAIT));
    assert!(!s.contains(id));
    s.cancel(id);
    assert!(!s.on_finished(id, DependentPolicy::Always, |_| {}));
    assert!(s.is_idle());
}

#[test]
fn late_dependent_of_canceled_task_is_canceled() {
    let mut s = scheduler(1);
    let log = log();
    let a = s.schedule(Box::new(recording("a", &log)));
    s.cancel(a);
    assert!(!s.contains(a));

    let b = s.schedule_with_deps(Box::new(recording("b", &log)), &[a], DependentPolicy::OnSuccess);
    assert!(!s.contains(b));
    s.schedule_with_deps(Box::new(recording("cleanup", &log)), &[a], DependentPolicy::Always);
    assert!(s.wait_idle(WAIT));

    let got = entries(&log);
    assert!(got.contains(&"b:canceled:DependencyCanceled".to_string()));
    assert!(got.contains(&"cleanup:run".to_string()));
    assert!(!got.iter().any(|e| e == "a:run" || e == "b:run"));
}

#[test]
fn late_dependent_of_finished_task_runs() {
    let mut s = scheduler(1);
    let log = log();
    let a = s.schedule(Box::new(recording("a", &log)));
    assert!(s.wait_idle(WAIT));
    s.schedule_with_deps(Box::new(recording("b", &log)), &[a], DependentPolicy::OnSuccess);
    assert!(s.wait_idle(WAIT));
    assert_eq!(entries(&log), ["a:run", "a:after", "b:run", "b:after"]);
}
