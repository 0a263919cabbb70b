use std::collections::VecDeque;

use crate::effects::effect::RasterEffect;
use crate::foundation::core::PixelRect;
use crate::foundation::error::FrameloomResult;
use crate::gpu::context::{GpuContext, GpuRenderData, GpuRenderTools};
use crate::render::image::RasterImage;
use crate::task::cancel::CancelToken;
use crate::task::hardware::{Hardware, HardwareResolver, HardwareSupport, QueueLoad};

/// Ordered queue of effects still to apply to one render snapshot.
///
/// Effects run strictly front to back and are popped once applied. A render task alternates
/// between [`EffectsRenderer::process_gpu`] (a run of GPU effects in one dispatch) and
/// [`EffectsRenderer::process_cpu`] (exactly one effect) until the queue is empty.
#[derive(Clone, Debug)]
pub struct EffectsRenderer {
    effects: VecDeque<RasterEffect>,
    resolver: HardwareResolver,
}

impl EffectsRenderer {
    pub fn new(effects: impl IntoIterator<Item = RasterEffect>, resolver: HardwareResolver) -> Self {
        Self {
            effects: effects.into_iter().collect(),
            resolver,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &RasterEffect> {
        self.effects.iter()
    }

    /// Working rect for the whole chain: the union of every intermediate expanded rect,
    /// clipped to `max_bounds`.
    pub fn set_base_global_rect(&self, base: PixelRect, max_bounds: PixelRect) -> PixelRect {
        let mut current = base;
        let mut covered = base;
        for fx in &self.effects {
            current = fx.dst_rect(current);
            covered = covered.union(current);
        }
        covered.intersect(max_bounds)
    }

    /// Hardware tag of the next pending effect.
    ///
    /// # Panics
    /// Panics if no effect is pending.
    pub fn next_hardware_support(&self) -> HardwareSupport {
        assert!(
            !self.effects.is_empty(),
            "next_hardware_support called on an empty effect list"
        );
        self.effects[0].hardware_support()
    }

    /// Where the next pending effect should run; `None` when it needs a GPU that is absent.
    pub fn next_hardware(&self, load: QueueLoad) -> Option<Hardware> {
        self.resolver
            .resolve_with_load(self.next_hardware_support(), load)
    }

    /// Apply the leading run of GPU-placed effects through ping-pong textures.
    ///
    /// Stops without consuming at the first effect placed on the CPU or without a shader
    /// program. Returns the number of effects applied.
    pub fn process_gpu(
        &mut self,
        gpu: &mut dyn GpuContext,
        image: &mut RasterImage,
        data: &GpuRenderData,
        cancel: &CancelToken,
    ) -> FrameloomResult<usize> {
        // The caller already placed the head effect on the GPU; the rest of the run follows
        // the resolver.
        let runnable = match self.effects.front() {
            Some(head) if head.gpu_program().is_some() => {
                1 + self
                    .effects
                    .iter()
                    .skip(1)
                    .take_while(|fx| {
                        fx.gpu_program().is_some()
                            && self.resolver.resolve(fx.hardware_support()) == Some(Hardware::Gpu)
                    })
                    .count()
            }
            _ => return Ok(0),
        };

        let mut tools = GpuRenderTools::new(gpu, image)?;
        for fx in self.effects.iter().take(runnable) {
            if let Err(e) = cancel.checkpoint() {
                tools.release(gpu);
                return Err(e);
            }
            let Some(program) = fx.gpu_program() else {
                break;
            };
            tracing::trace!(?program, "gpu effect");
            if let Err(e) = gpu.run_program(&program, tools.source(), tools.target(), data) {
                tools.release(gpu);
                return Err(e);
            }
            tools.swap();
        }
        *image = tools.finish(gpu)?;
        self.effects.drain(..runnable);
        Ok(runnable)
    }

    /// Apply exactly the next pending effect on the CPU.
    ///
    /// # Panics
    /// Panics if no effect is pending or the next effect is GPU-only.
    pub fn process_cpu(&mut self, image: &mut RasterImage, cancel: &CancelToken) -> FrameloomResult<()> {
        assert!(
            !self.next_hardware_support().gpu_only(),
            "process_cpu called for a gpu-only effect"
        );
        let fx = self.effects[0];
        tracing::trace!(effect = ?fx, "cpu effect");
        fx.apply_cpu(image, cancel)?;
        self.effects.pop_front();
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/renderer.rs"]
mod tests;
