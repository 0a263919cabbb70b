use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::core::FrameRange;
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::render::image::RasterImage;

/// Stream parameters announced before the first frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frames: FrameRange,
}

impl SinkInfo {
    pub fn validate(&self) -> FrameloomResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameloomError::validation("sink width/height must be non-zero"));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(FrameloomError::validation("sink fps must be positive"));
        }
        if self.frames.is_empty() {
            return Err(FrameloomError::validation("sink frame range is empty"));
        }
        Ok(())
    }
}

/// Consumer of exported frames, fed in ascending frame order.
pub trait FrameSink {
    fn begin(&mut self, info: &SinkInfo) -> FrameloomResult<()>;

    fn push_frame(&mut self, frame: i64, image: &Arc<RasterImage>) -> FrameloomResult<()>;

    fn end(&mut self) -> FrameloomResult<()>;
}

/// Keeps every pushed frame; used by tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub info: Option<SinkInfo>,
    pub frames: Vec<(i64, Arc<RasterImage>)>,
    pub ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, info: &SinkInfo) -> FrameloomResult<()> {
        info.validate()?;
        self.info = Some(*info);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: i64, image: &Arc<RasterImage>) -> FrameloomResult<()> {
        self.frames.push((frame, Arc::clone(image)));
        Ok(())
    }

    fn end(&mut self) -> FrameloomResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Writes `<prefix>_<frame:05>.png` files into a directory.
#[derive(Clone, Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    prefix: String,
    overwrite: bool,
    written: Vec<PathBuf>,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "frame".to_string(),
            overwrite: true,
            written: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn path_for(&self, frame: i64) -> PathBuf {
        self.dir.join(format!("{}_{frame:05}.png", self.prefix))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, info: &SinkInfo) -> FrameloomResult<()> {
        info.validate()?;
        use anyhow::Context as _;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create output directory '{}'", self.dir.display()))?;
        self.written.clear();
        Ok(())
    }

    fn push_frame(&mut self, frame: i64, image: &Arc<RasterImage>) -> FrameloomResult<()> {
        let path = self.path_for(frame);
        if !self.overwrite && path.exists() {
            return Err(FrameloomError::validation(format!(
                "output file '{}' already exists",
                path.display()
            )));
        }
        image.save_png(&path)?;
        tracing::trace!(frame, path = %path.display(), "frame written");
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> FrameloomResult<()> {
        tracing::debug!(frames = self.written.len(), dir = %self.dir.display(), "png sequence done");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
