use crate::foundation::core::Rgba;
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::render::image::RasterImage;

/// Handle to a texture owned by a [`GpuContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Shader programs the effect pipeline can dispatch, with typed uniforms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderProgram {
    /// Shift color towards white or black by `amount` in `-1..=1`.
    Brightness {
        /// Signed amount.
        amount: f64,
    },
    /// Scale distance from mid-gray by `1 + amount`.
    Contrast {
        /// Signed amount.
        amount: f64,
    },
    /// Mix towards `color`.
    Tint {
        /// Target color.
        color: Rgba,
        /// Mix factor in `0..=1`.
        amount: f64,
    },
}

/// Per-dispatch uniforms shared by every program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpuRenderData {
    /// Top-left of the texture in canvas pixels.
    pub pos: (i32, i32),
    /// Texture size in pixels.
    pub size: (u32, u32),
    /// Resolution fraction the texture was rendered at.
    pub resolution: f64,
}

/// Exclusive GPU device handle, owned by the GPU worker thread.
pub trait GpuContext: Send {
    /// Human readable backend name.
    fn name(&self) -> &str;

    /// Upload a premultiplied image.
    fn upload(&mut self, image: &RasterImage) -> FrameloomResult<TextureId>;

    /// Allocate an uninitialized render target.
    fn create_target(&mut self, width: u32, height: u32) -> FrameloomResult<TextureId>;

    /// Run `program` sampling `src` and writing every pixel of `dst`.
    fn run_program(
        &mut self,
        program: &ShaderProgram,
        src: TextureId,
        dst: TextureId,
        data: &GpuRenderData,
    ) -> FrameloomResult<()>;

    /// Read a texture back into host memory.
    fn download(&mut self, texture: TextureId) -> FrameloomResult<RasterImage>;

    /// Free a texture. Unknown handles are ignored.
    fn release(&mut self, texture: TextureId);

    /// Whether the device was lost; every later call is expected to fail.
    fn is_lost(&self) -> bool {
        false
    }
}

/// Source/target texture pair for chaining programs.
#[derive(Debug)]
pub struct GpuRenderTools {
    src: TextureId,
    dst: TextureId,
}

impl GpuRenderTools {
    /// Upload `image` as the source and allocate a matching target.
    pub fn new(gpu: &mut dyn GpuContext, image: &RasterImage) -> FrameloomResult<Self> {
        if gpu.is_lost() {
            return Err(FrameloomError::resource(format!(
                "gpu context '{}' was lost",
                gpu.name()
            )));
        }
        let src = gpu.upload(image)?;
        let dst = match gpu.create_target(image.width, image.height) {
            Ok(dst) => dst,
            Err(e) => {
                gpu.release(src);
                return Err(e);
            }
        };
        Ok(Self { src, dst })
    }

    pub fn source(&self) -> TextureId {
        self.src
    }

    pub fn target(&self) -> TextureId {
        self.dst
    }

    /// The last target becomes the next source.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.src, &mut self.dst);
    }

    /// Download the current source and free both textures.
    pub fn finish(self, gpu: &mut dyn GpuContext) -> FrameloomResult<RasterImage> {
        let out = gpu.download(self.src);
        self.release(gpu);
        out
    }

    pub fn release(self, gpu: &mut dyn GpuContext) {
        gpu.release(self.src);
        gpu.release(self.dst);
    }
}
