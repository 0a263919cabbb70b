use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::effects::renderer::EffectsRenderer;
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::gpu::context::{GpuContext, GpuRenderData};
use crate::render::data::{RenderData, RenderSlot};
use crate::render::image::RasterImage;
use crate::render::raster::rasterize;
use crate::render::setup::{FramePlan, PlannedJob};
use crate::task::cancel::CancelToken;
use crate::task::hardware::{Hardware, HardwareResolver, HardwareSupport};
use crate::task::scheduler::{DependentPolicy, Scheduler, TaskId};
use crate::task::task::{Affinity, CancelReason, Progress, Task};

/// Outcome of a frame's root render task.
#[derive(Clone, Debug)]
pub enum RenderEvent {
    Finished {
        frame: i64,
        /// Serial of the request that scheduled the frame.
        serial: u64,
        data: Arc<RenderData>,
    },
    Canceled {
        frame: i64,
        serial: u64,
        reason: CancelReason,
    },
}

impl RenderEvent {
    pub fn frame(&self) -> i64 {
        match self {
            Self::Finished { frame, .. } | Self::Canceled { frame, .. } => *frame,
        }
    }

    pub fn serial(&self) -> u64 {
        match self {
            Self::Finished { serial, .. } | Self::Canceled { serial, .. } => *serial,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Raster,
    Effects,
    Done,
}

struct Notify {
    frame: i64,
    serial: u64,
    tx: Sender<RenderEvent>,
}

/// Renders one snapshot: rasterize, then apply its effects one hardware run at a time.
///
/// Each stage returns [`Progress::Continue`] so the scheduler can move the next effect to
/// the hardware it resolves to. On success the rendered snapshot is published into its slot.
pub struct RenderTask {
    name: String,
    data: Option<RenderData>,
    slot: RenderSlot,
    image: Option<RasterImage>,
    effects: EffectsRenderer,
    stage: Stage,
    notify: Option<Notify>,
}

impl RenderTask {
    pub fn new(job: PlannedJob, resolver: HardwareResolver) -> Self {
        let PlannedJob { data, slot } = job;
        Self {
            name: format!("render {:?}@{}", data.entity, data.rel_frame),
            effects: EffectsRenderer::new(data.effects.iter().copied(), resolver),
            data: Some(data),
            slot,
            image: None,
            stage: Stage::Raster,
            notify: None,
        }
    }

    /// Report the outcome on `tx`; used for the root job of a frame.
    pub fn with_events(mut self, frame: i64, serial: u64, tx: Sender<RenderEvent>) -> Self {
        self.notify = Some(Notify { frame, serial, tx });
        self
    }

    fn advance(&mut self) -> Progress {
        if self.effects.is_empty() {
            self.stage = Stage::Done;
            Progress::Finished
        } else {
            self.stage = Stage::Effects;
            Progress::Continue
        }
    }

    fn take_image(&mut self) -> FrameloomResult<RasterImage> {
        self.image
            .take()
            .ok_or_else(|| FrameloomError::render("effect stage before rasterization"))
    }
}

impl Task for RenderTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn affinity(&self) -> Affinity {
        match self.stage {
            Stage::Effects if !self.effects.is_empty() => {
                Affinity::Compute(self.effects.next_hardware_support())
            }
            _ => Affinity::Compute(HardwareSupport::CpuOnly),
        }
    }

    fn before_processing(&mut self, hardware: Hardware) {
        tracing::trace!(task = %self.name, stage = ?self.stage, ?hardware, "render stage");
    }

    fn process_cpu(&mut self, cancel: &CancelToken) -> FrameloomResult<Progress> {
        match self.stage {
            Stage::Raster => {
                let data = self
                    .data
                    .as_ref()
                    .ok_or_else(|| FrameloomError::render("render data already consumed"))?;
                self.image = Some(rasterize(data, cancel)?);
                Ok(self.advance())
            }
            Stage::Effects => {
                let mut image = self.take_image()?;
                let applied = self.effects.process_cpu(&mut image, cancel);
                self.image = Some(image);
                applied?;
                Ok(self.advance())
            }
            Stage::Done => Ok(Progress::Finished),
        }
    }

    fn process_gpu(
        &mut self,
        gpu: &mut dyn GpuContext,
        cancel: &CancelToken,
    ) -> FrameloomResult<Progress> {
        if self.stage != Stage::Effects {
            return Err(FrameloomError::render("gpu stage outside the effect chain"));
        }
        let Some(data) = self.data.as_ref() else {
            return Err(FrameloomError::render("render data already consumed"));
        };
        let rect = data.global_rect;
        let resolution = data.resolution;
        let mut image = self.take_image()?;
        let uniforms = GpuRenderData {
            pos: (rect.x0, rect.y0),
            size: (image.width, image.height),
            resolution,
        };
        let applied = self.effects.process_gpu(gpu, &mut image, &uniforms, cancel);
        self.image = Some(image);
        if applied? == 0 {
            return Err(FrameloomError::render("no gpu program for the next effect"));
        }
        Ok(self.advance())
    }

    fn after_processing(&mut self) {
        let (Some(mut data), Some(image)) = (self.data.take(), self.image.take()) else {
            return;
        };
        data.image = Some(Arc::new(image));
        let data = Arc::new(data);
        if self.slot.set(Arc::clone(&data)).is_err() {
            tracing::warn!(task = %self.name, "render slot already published");
        }
        if let Some(n) = self.notify.take() {
            let _ = n.tx.send(RenderEvent::Finished {
                frame: n.frame,
                serial: n.serial,
                data,
            });
        }
    }

    fn after_canceled(&mut self, reason: &CancelReason) {
        if let Some(n) = self.notify.take() {
            let _ = n.tx.send(RenderEvent::Canceled {
                frame: n.frame,
                serial: n.serial,
                reason: reason.clone(),
            });
        }
    }
}

/// Schedule every job of `plan`, children before parents, with the root reporting on
/// `events`. Returns the task ids in plan order; the last one is the root.
pub fn schedule_plan(
    scheduler: &mut Scheduler,
    plan: FramePlan,
    serial: u64,
    events: &Sender<RenderEvent>,
) -> Vec<TaskId> {
    let resolver = scheduler.resolver();
    let frame = plan.frame;
    let count = plan.jobs.len();
    let mut ids: Vec<TaskId> = Vec::with_capacity(count);
    for (i, job) in plan.jobs.into_iter().enumerate() {
        let deps: Vec<TaskId> = job
            .data
            .dependencies()
            .into_iter()
            .filter_map(|j| ids.get(j).copied())
            .collect();
        let mut task = RenderTask::new(job, resolver);
        if i + 1 == count {
            task = task.with_events(frame, serial, events.clone());
        }
        ids.push(scheduler.schedule_with_deps(Box::new(task), &deps, DependentPolicy::OnSuccess));
    }
    tracing::debug!(frame, serial, tasks = ids.len(), "frame scheduled");
    ids
}

#[cfg(test)]
#[path = "../../tests/unit/render/task.rs"]
mod tests;
