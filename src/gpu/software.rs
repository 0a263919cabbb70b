use std::collections::HashMap;

use crate::effects::kernels;
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::gpu::context::{GpuContext, GpuRenderData, ShaderProgram, TextureId};
use crate::render::image::RasterImage;

/// [`GpuContext`] that keeps textures in host memory and runs programs with the CPU kernels.
///
/// Used as the default device when no hardware backend is configured, and in tests.
#[derive(Debug, Default)]
pub struct SoftwareGpu {
    textures: HashMap<TextureId, RasterImage>,
    next_id: u64,
    programs_run: u64,
    lost: bool,
}

impl SoftwareGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of programs dispatched so far.
    pub fn programs_run(&self) -> u64 {
        self.programs_run
    }

    /// Live texture count.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Simulate a device loss.
    pub fn lose(&mut self) {
        self.lost = true;
        self.textures.clear();
    }

    fn alloc(&mut self, image: RasterImage) -> FrameloomResult<TextureId> {
        self.ensure_alive()?;
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, image);
        Ok(id)
    }

    fn ensure_alive(&self) -> FrameloomResult<()> {
        if self.lost {
            return Err(FrameloomError::resource("software gpu context was lost"));
        }
        Ok(())
    }

    fn texture(&self, id: TextureId) -> FrameloomResult<&RasterImage> {
        self.textures
            .get(&id)
            .ok_or_else(|| FrameloomError::resource(format!("unknown texture {}", id.0)))
    }
}

impl GpuContext for SoftwareGpu {
    fn name(&self) -> &str {
        "software"
    }

    fn upload(&mut self, image: &RasterImage) -> FrameloomResult<TextureId> {
        self.alloc(image.clone())
    }

    fn create_target(&mut self, width: u32, height: u32) -> FrameloomResult<TextureId> {
        self.alloc(RasterImage::new(width, height))
    }

    fn run_program(
        &mut self,
        program: &ShaderProgram,
        src: TextureId,
        dst: TextureId,
        data: &GpuRenderData,
    ) -> FrameloomResult<()> {
        self.ensure_alive()?;
        let mut out = self.texture(src)?.clone();
        let target = self.texture(dst)?;
        if (target.width, target.height) != (out.width, out.height)
            || (out.width, out.height) != data.size
        {
            return Err(FrameloomError::render("gpu program source/target size mismatch"));
        }
        match *program {
            ShaderProgram::Brightness { amount } => kernels::brightness_in_place(&mut out, amount),
            ShaderProgram::Contrast { amount } => kernels::contrast_in_place(&mut out, amount),
            ShaderProgram::Tint { color, amount } => kernels::tint_in_place(&mut out, color, amount),
        }
        self.textures.insert(dst, out);
        self.programs_run += 1;
        Ok(())
    }

    fn download(&mut self, texture: TextureId) -> FrameloomResult<RasterImage> {
        self.ensure_alive()?;
        self.texture(texture).cloned()
    }

    fn release(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn is_lost(&self) -> bool {
        self.lost
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/software.rs"]
mod tests;
