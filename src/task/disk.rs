use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::foundation::core::EntityKey;
use crate::foundation::error::FrameloomResult;
use crate::render::image::RasterImage;
use crate::task::cancel::CancelToken;
use crate::task::task::{Affinity, CancelReason, Progress, Task};

/// Result of an image load, delivered on the owner's thread.
#[derive(Debug)]
pub struct LoadedImage {
    pub entity: EntityKey,
    pub path: PathBuf,
    pub result: Result<Arc<RasterImage>, String>,
}

/// Reads and decodes an image file on the disk worker.
pub struct ImageLoadTask {
    entity: EntityKey,
    path: PathBuf,
    image: Option<RasterImage>,
    tx: Sender<LoadedImage>,
}

impl ImageLoadTask {
    pub fn new(entity: EntityKey, path: PathBuf, tx: Sender<LoadedImage>) -> Self {
        Self {
            entity,
            path,
            image: None,
            tx,
        }
    }

    fn send(&self, result: Result<Arc<RasterImage>, String>) {
        let _ = self.tx.send(LoadedImage {
            entity: self.entity,
            path: self.path.clone(),
            result,
        });
    }
}

impl Task for ImageLoadTask {
    fn name(&self) -> &str {
        "image-load"
    }

    fn affinity(&self) -> Affinity {
        Affinity::Disk
    }

    fn process_cpu(&mut self, cancel: &CancelToken) -> FrameloomResult<Progress> {
        cancel.checkpoint()?;
        self.image = Some(RasterImage::load(&self.path)?);
        Ok(Progress::Finished)
    }

    fn after_processing(&mut self) {
        if let Some(image) = self.image.take() {
            self.send(Ok(Arc::new(image)));
        }
    }

    fn after_canceled(&mut self, reason: &CancelReason) {
        let msg = match reason {
            CancelReason::Failed(msg) => msg.clone(),
            other => format!("{other:?}"),
        };
        self.send(Err(msg));
    }
}
