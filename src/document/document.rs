use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use slotmap::Key as _;

use crate::animation::composite::{ChannelGroup, record_edit};
use crate::animation::history::{History, HistoryEntry};
use crate::cache::frame_cache::FrameCache;
use crate::cache::memory::{MemoryChecker, MemoryReport};
use crate::encode::sink::{FrameSink, SinkInfo};
use crate::foundation::core::{Affine, EntityKey, FrameRange};
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::gpu::context::GpuContext;
use crate::render::data::{ChildRender, RenderData, RenderSource};
use crate::render::image::RasterImage;
use crate::render::setup::plan_frame;
use crate::render::task::{RenderEvent, schedule_plan};
use crate::scene::entity::{BoxEntity, PropertyKey};
use crate::scene::model::Scene;
use crate::settings::Settings;
use crate::task::disk::{ImageLoadTask, LoadedImage};
use crate::task::scheduler::{Scheduler, SchedulerStats, TaskId};
use crate::task::task::CancelReason;

const POLL: Duration = Duration::from_millis(5);
/// Frames requested ahead of the one being exported.
const EXPORT_LOOKAHEAD: usize = 4;

/// A frame finished rendering and entered the cache.
#[derive(Clone, Debug)]
pub struct FrameReady {
    pub frame: i64,
    pub image: Arc<RasterImage>,
}

/// Where a requested frame stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Cached,
    /// Rendering; a [`FrameReady`] follows from [`Document::pump`].
    Pending,
}

struct InFlight {
    serial: u64,
    tasks: Vec<TaskId>,
    /// Frames still known to match the snapshot this render was planned from.
    valid: FrameRange,
}

/// Explicit editing context: the scene plus the scheduler, frame cache and undo history
/// that serve it.
///
/// All methods run on the owning thread. Render work runs on the scheduler's workers and
/// only ever sees snapshots; [`Document::pump`] brings its results back.
pub struct Document {
    scene: Scene,
    settings: Settings,
    scheduler: Scheduler,
    cache: FrameCache,
    history: History,
    memory: MemoryChecker,
    events_tx: Sender<RenderEvent>,
    events_rx: Receiver<RenderEvent>,
    in_flight: HashMap<i64, InFlight>,
    next_serial: u64,
    pinned: HashSet<i64>,
    latest: HashMap<EntityKey, Arc<RenderData>>,
    loads_tx: Sender<LoadedImage>,
    loads_rx: Receiver<LoadedImage>,
    loading: HashSet<EntityKey>,
    load_errors: Vec<String>,
}

impl Document {
    /// Spawn the workers described by `settings`; `gpu` becomes the GPU thread's context.
    pub fn new(
        scene: Scene,
        settings: Settings,
        gpu: Option<Box<dyn GpuContext>>,
    ) -> FrameloomResult<Self> {
        settings.validate()?;
        let scheduler = Scheduler::new(settings.cpu_threads(), settings.acc_preference, gpu)?;
        let cache = match settings.cache_budget_bytes() {
            Some(bytes) => FrameCache::with_budget(bytes),
            None => FrameCache::new(),
        };
        // Nothing is cached yet, so construction-time notifications carry no information.
        let _ = scene.drain_changes();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (loads_tx, loads_rx) = crossbeam_channel::unbounded();
        tracing::info!(
            width = scene.width(),
            height = scene.height(),
            entities = scene.len(),
            gpu = scheduler.has_gpu(),
            "document opened"
        );
        Ok(Self {
            history: History::new(settings.undo_cap),
            memory: MemoryChecker::new(settings.ram_mb_cap),
            scene,
            settings,
            scheduler,
            cache,
            events_tx,
            events_rx,
            in_flight: HashMap::new(),
            next_serial: 0,
            pinned: HashSet::new(),
            latest: HashMap::new(),
            loads_tx,
            loads_rx,
            loading: HashSet::new(),
            load_errors: Vec::new(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene access. Animator edits still invalidate through change notifications;
    /// structural edits should go through [`Document::modify`].
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn is_pending(&self, frame: i64) -> bool {
        self.in_flight.contains_key(&frame)
    }

    /// Start rendering `frame` unless it is cached or already rendering.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn request_frame(&mut self, frame: i64) -> FrameloomResult<FrameStatus> {
        self.apply_changes();
        if self.cache.get(frame).is_some() {
            return Ok(FrameStatus::Cached);
        }
        if self.in_flight.contains_key(&frame) {
            return Ok(FrameStatus::Pending);
        }
        let plan = plan_frame(&self.scene, frame, self.scheduler.resolver())?;
        self.next_serial += 1;
        let serial = self.next_serial;
        let tasks = schedule_plan(&mut self.scheduler, plan, serial, &self.events_tx);
        self.in_flight.insert(
            frame,
            InFlight {
                serial,
                tasks,
                valid: FrameRange::UNBOUNDED,
            },
        );
        Ok(FrameStatus::Pending)
    }

    /// Process invalidations, dispatch work and collect finished frames.
    pub fn pump(&mut self) -> Vec<FrameReady> {
        self.apply_loads();
        self.apply_changes();
        self.scheduler.pump();

        let mut ready = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            let frame = event.frame();
            if self.in_flight.get(&frame).map(|f| f.serial) != Some(event.serial()) {
                tracing::trace!(frame, serial = event.serial(), "stale render event dropped");
                continue;
            }
            let Some(job) = self.in_flight.remove(&frame) else {
                continue;
            };
            match event {
                RenderEvent::Finished { data, .. } => {
                    let Some(image) = data.image.clone() else {
                        continue;
                    };
                    let range = data.identical_range.intersect(job.valid);
                    self.cache
                        .insert(frame, Arc::clone(&image), data.resolution, range);
                    if self.pinned.contains(&frame) {
                        self.cache.set_blocked(frame, true);
                    }
                    self.record_latest(&data);
                    self.cache.trim_to_budget();
                    tracing::debug!(frame, "frame ready");
                    ready.push(FrameReady { frame, image });
                }
                RenderEvent::Canceled { reason, .. } => {
                    if reason != CancelReason::Requested {
                        tracing::warn!(frame, ?reason, "frame render canceled");
                    }
                }
            }
        }
        ready
    }

    /// Render `frame` and wait for it, loading pending images first.
    pub fn render_frame_blocking(
        &mut self,
        frame: i64,
        timeout: Duration,
    ) -> FrameloomResult<Arc<RasterImage>> {
        let deadline = Instant::now() + timeout;
        self.wait_for_resources(timeout)?;
        self.request_frame(frame)?;
        loop {
            self.pump();
            if let Some(e) = self.cache.get(frame) {
                return Ok(Arc::clone(&e.image));
            }
            if !self.in_flight.contains_key(&frame) {
                return Err(FrameloomError::render(format!(
                    "frame {frame} was canceled before it finished"
                )));
            }
            if Instant::now() >= deadline {
                return Err(FrameloomError::resource(format!(
                    "timed out waiting for frame {frame}"
                )));
            }
            self.scheduler.wait_idle(POLL);
        }
    }

    /// Cached image for `frame`, marking it as displayed.
    pub fn frame(&mut self, frame: i64) -> Option<Arc<RasterImage>> {
        let (stored, entry) = self.cache.lookup(frame)?;
        let image = Arc::clone(&entry.image);
        self.cache.mark_displayed(stored);
        Some(image)
    }

    /// Latest finished snapshot of `entity`, from the most recent frame that drew it.
    pub fn latest_render_data(&self, entity: EntityKey) -> Option<Arc<RenderData>> {
        self.latest.get(&entity).cloned()
    }

    /// Structural edit of one entity; invalidates it on every frame. Not undoable.
    pub fn modify<R>(
        &mut self,
        entity: EntityKey,
        f: impl FnOnce(&mut BoxEntity) -> R,
    ) -> FrameloomResult<R> {
        self.scene.modify(entity, f)
    }

    /// Edit one animated property as a single undo step.
    pub fn edit(
        &mut self,
        entity: EntityKey,
        property: PropertyKey,
        f: impl FnOnce(&mut dyn ChannelGroup),
    ) -> FrameloomResult<()> {
        let group = self.property_mut(entity, property)?;
        let edit = record_edit(group, |g| f(g));
        self.history.push(HistoryEntry {
            entity,
            property,
            edit,
        });
        Ok(())
    }

    /// Map an entity's position through `affine` at every key, as one undo step.
    pub fn apply_transform(&mut self, entity: EntityKey, affine: Affine) -> FrameloomResult<()> {
        let e = self
            .scene
            .get_mut(entity)
            .ok_or_else(|| FrameloomError::validation("unknown entity"))?;
        let edit = e.transform.position.apply_transform(affine);
        self.history.push(HistoryEntry {
            entity,
            property: PropertyKey::Position,
            edit,
        });
        Ok(())
    }

    /// Revert the newest edit. Returns `false` when there is nothing to undo.
    ///
    /// Fails, leaving history untouched, when the edited entity or property is gone.
    pub fn undo(&mut self) -> FrameloomResult<bool> {
        let Some(entry) = self.history.peek_undo().cloned() else {
            return Ok(false);
        };
        self.property_mut(entry.entity, entry.property)?
            .restore(&entry.edit.before);
        self.history.take_undo();
        Ok(true)
    }

    /// Reapply the newest undone edit. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> FrameloomResult<bool> {
        let Some(entry) = self.history.peek_redo().cloned() else {
            return Ok(false);
        };
        self.property_mut(entry.entity, entry.property)?
            .restore(&entry.edit.after);
        self.history.take_redo();
        Ok(true)
    }

    fn property_mut(
        &mut self,
        entity: EntityKey,
        property: PropertyKey,
    ) -> FrameloomResult<&mut dyn ChannelGroup> {
        self.scene
            .get_mut(entity)
            .ok_or_else(|| FrameloomError::validation("unknown entity"))?
            .property_mut(property)
            .ok_or_else(|| FrameloomError::validation(format!("entity has no {property:?} property")))
    }

    /// Poll system memory and release cached frames accordingly.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn check_memory(&mut self) -> MemoryReport {
        let report = self.memory.check(self.cache.bytes() as u64);
        let freed = self.cache.handle_memory_state(&report);
        if freed > 0 {
            tracing::info!(state = ?report.state, freed, "frame cache evicted under memory pressure");
        }
        report
    }

    /// Render every frame of `range` and feed them to `sink` in order.
    ///
    /// A few frames ahead render concurrently; they stay pinned in the cache until pushed.
    /// `timeout` bounds each frame.
    #[tracing::instrument(level = "info", skip(self, sink))]
    pub fn export_range(
        &mut self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
        timeout: Duration,
    ) -> FrameloomResult<usize> {
        if range.is_empty() || range.is_unbounded() {
            return Err(FrameloomError::validation("export range must be finite and non-empty"));
        }
        let info = SinkInfo {
            width: self.scene.canvas_rect().width(),
            height: self.scene.canvas_rect().height(),
            fps: self.scene.fps(),
            frames: range,
        };
        sink.begin(&info)?;
        self.wait_for_resources(timeout)?;

        let frames: Vec<i64> = range.frames().collect();
        let result = self.export_frames(&frames, sink, timeout);
        for frame in std::mem::take(&mut self.pinned) {
            self.cache.set_blocked(frame, false);
        }
        let written = result?;
        sink.end()?;
        tracing::info!(frames = written, "export finished");
        Ok(written)
    }

    fn export_frames(
        &mut self,
        frames: &[i64],
        sink: &mut dyn FrameSink,
        timeout: Duration,
    ) -> FrameloomResult<usize> {
        let mut written = 0;
        for (i, &frame) in frames.iter().enumerate() {
            for &ahead in frames.iter().skip(i).take(EXPORT_LOOKAHEAD) {
                if self.pinned.insert(ahead) {
                    self.cache.set_blocked(ahead, true);
                }
                self.request_frame(ahead)?;
            }
            let image = self.render_frame_blocking(frame, timeout)?;
            sink.push_frame(frame, &image)?;
            self.pinned.remove(&frame);
            self.cache.set_blocked(frame, false);
            written += 1;
        }
        Ok(written)
    }

    /// Load every image box that has no pixels yet, waiting up to `timeout`.
    pub fn wait_for_resources(&mut self, timeout: Duration) -> FrameloomResult<usize> {
        let pending = self.scene.pending_images();
        let mut started = 0;
        for (entity, path) in pending {
            if self.loading.insert(entity) {
                let task = ImageLoadTask::new(entity, path, self.loads_tx.clone());
                self.scheduler.schedule(Box::new(task));
                started += 1;
            }
        }
        let deadline = Instant::now() + timeout;
        while !self.loading.is_empty() {
            self.pump();
            if self.loading.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(FrameloomError::resource("timed out loading images"));
            }
            self.scheduler.wait_idle(POLL);
        }
        if !self.load_errors.is_empty() {
            let errors = std::mem::take(&mut self.load_errors);
            return Err(FrameloomError::resource(errors.join("; ")));
        }
        Ok(started)
    }

    fn apply_loads(&mut self) {
        while let Ok(loaded) = self.loads_rx.try_recv() {
            self.loading.remove(&loaded.entity);
            match loaded.result {
                Ok(image) => {
                    if let Err(e) = self.scene.set_image(loaded.entity, image) {
                        tracing::warn!(path = %loaded.path.display(), error = %e, "image dropped");
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %loaded.path.display(), error = %e, "image load failed");
                    self.load_errors
                        .push(format!("load '{}': {e}", loaded.path.display()));
                }
            }
        }
    }

    /// Drop cached frames and cancel renders that a scene change made stale.
    fn apply_changes(&mut self) {
        let changes = self.scene.drain_changes();
        if changes.is_empty() {
            return;
        }
        let mut range = FrameRange::new(1, 0);
        for change in &changes {
            range = range.union(change.range);
        }
        self.cache.invalidate_range(range);
        let stale: Vec<i64> = self
            .in_flight
            .keys()
            .copied()
            .filter(|f| range.contains(*f))
            .collect();
        for frame in stale {
            if let Some(job) = self.in_flight.remove(&frame) {
                for id in job.tasks.into_iter().rev() {
                    self.scheduler.cancel(id);
                }
            }
        }
        // Surviving renders stay valid, but not across the changed frames.
        for (&frame, job) in &mut self.in_flight {
            if range.is_empty() {
                break;
            }
            if range.min > frame {
                job.valid.max = job.valid.max.min(range.min.saturating_sub(1));
            } else {
                job.valid.min = job.valid.min.max(range.max.saturating_add(1));
            }
        }
        self.latest.retain(|k, _| self.scene.contains(*k));
        tracing::debug!(changes = changes.len(), min = range.min, max = range.max, "scene changed");
    }

    fn record_latest(&mut self, root: &Arc<RenderData>) {
        let mut stack = vec![Arc::clone(root)];
        while let Some(data) = stack.pop() {
            if !data.entity.is_null() {
                self.latest.insert(data.entity, Arc::clone(&data));
            }
            if let RenderSource::Container { children, .. } = &data.source {
                for child in children {
                    match child {
                        ChildRender::Direct(d) => stack.push(Arc::clone(d)),
                        ChildRender::Rasterized { slot, .. } => {
                            if let Some(d) = slot.get() {
                                stack.push(Arc::clone(d));
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        for job in self.in_flight.values() {
            for id in &job.tasks {
                self.scheduler.cancel(*id);
            }
        }
        if !self.scheduler.wait_idle(Duration::from_secs(5)) {
            tracing::warn!("document closed with render work still running");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/document.rs"]
mod tests;
