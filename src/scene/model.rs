use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use slotmap::{Key as _, SlotMap};

use crate::animation::notify::{ChangeNotifier, ValueChanged, change_channel};
use crate::foundation::core::{EntityKey, FrameRange, PixelRect, Rgba};
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::render::image::RasterImage;
use crate::scene::entity::{BoxEntity, BoxKind};

/// Entity arena plus canvas settings.
///
/// Every animator in the arena reports edits on one change channel; the owner drains it with
/// [`Scene::drain_changes`]. Scene-level edits are reported with a null entity key.
#[derive(Debug)]
pub struct Scene {
    entities: SlotMap<EntityKey, BoxEntity>,
    roots: Vec<EntityKey>,
    width: u32,
    height: u32,
    background: Rgba,
    resolution: f64,
    fps: f64,
    frame_range: FrameRange,
    changes_tx: Sender<ValueChanged>,
    changes_rx: Receiver<ValueChanged>,
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Self {
        let (changes_tx, changes_rx) = change_channel();
        Self {
            entities: SlotMap::with_key(),
            roots: Vec::new(),
            width,
            height,
            background: Rgba::TRANSPARENT,
            resolution: 1.0,
            fps: 24.0,
            frame_range: FrameRange::new(0, 99),
            changes_tx,
            changes_rx,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_range(&self) -> FrameRange {
        self.frame_range
    }

    pub fn set_background(&mut self, color: Rgba) {
        self.background = color;
        self.notify_scene();
    }

    /// Fraction of the canvas size frames are rendered at.
    pub fn set_resolution(&mut self, resolution: f64) -> FrameloomResult<()> {
        if !resolution.is_finite() || resolution <= 0.0 || resolution > 1.0 {
            return Err(FrameloomError::validation("resolution must be in (0, 1]"));
        }
        self.resolution = resolution;
        self.notify_scene();
        Ok(())
    }

    pub fn set_fps(&mut self, fps: f64) -> FrameloomResult<()> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FrameloomError::validation("fps must be > 0"));
        }
        self.fps = fps;
        Ok(())
    }

    pub fn set_frame_range(&mut self, range: FrameRange) -> FrameloomResult<()> {
        if range.is_empty() || range.is_unbounded() {
            return Err(FrameloomError::validation("scene frame range must be finite"));
        }
        self.frame_range = range;
        Ok(())
    }

    /// Output rect in pixels at the current resolution.
    pub fn canvas_rect(&self) -> PixelRect {
        let scale = |v: u32| (f64::from(v) * self.resolution).ceil().max(1.0) as u32;
        PixelRect::from_size(scale(self.width), scale(self.height))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn roots(&self) -> &[EntityKey] {
        &self.roots
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn get(&self, key: EntityKey) -> Option<&BoxEntity> {
        self.entities.get(key)
    }

    /// Direct access; animator edits still notify, structural changes should go through
    /// [`Scene::modify`].
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut BoxEntity> {
        self.entities.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &BoxEntity)> {
        self.entities.iter()
    }

    /// Add a top-level entity.
    pub fn add(&mut self, entity: BoxEntity) -> EntityKey {
        let key = self.insert(entity, None);
        self.roots.push(key);
        key
    }

    /// Add `entity` as the last child of layer `parent`.
    pub fn add_child(&mut self, parent: EntityKey, entity: BoxEntity) -> FrameloomResult<EntityKey> {
        match self.entities.get(parent) {
            Some(p) if p.is_layer() => {}
            Some(_) => {
                return Err(FrameloomError::validation("only layers can hold children"));
            }
            None => return Err(FrameloomError::validation("unknown parent entity")),
        }
        let key = self.insert(entity, Some(parent));
        if let Some(p) = self.entities.get_mut(parent) {
            p.children.push(key);
        }
        Ok(key)
    }

    fn insert(&mut self, mut entity: BoxEntity, parent: Option<EntityKey>) -> EntityKey {
        entity.parent = parent;
        entity.children.clear();
        let key = self.entities.insert(entity);
        let notifier = self.notifier(key);
        if let Some(e) = self.entities.get_mut(key) {
            e.attach_notifier(&notifier);
        }
        notifier.notify(FrameRange::UNBOUNDED);
        key
    }

    /// Remove an entity and its whole subtree.
    pub fn remove(&mut self, key: EntityKey) -> Option<BoxEntity> {
        let entity = self.entities.remove(key)?;
        match entity.parent {
            Some(parent) => {
                if let Some(p) = self.entities.get_mut(parent) {
                    p.children.retain(|c| *c != key);
                }
            }
            None => self.roots.retain(|r| *r != key),
        }
        let mut stack = entity.children.clone();
        while let Some(child) = stack.pop() {
            if let Some(c) = self.entities.remove(child) {
                stack.extend(c.children);
            }
        }
        self.notifier(key).notify(FrameRange::UNBOUNDED);
        Some(entity)
    }

    /// Apply a structural edit and report the entity as changed on every frame.
    pub fn modify<R>(
        &mut self,
        key: EntityKey,
        f: impl FnOnce(&mut BoxEntity) -> R,
    ) -> FrameloomResult<R> {
        let notifier = self.notifier(key);
        let entity = self
            .entities
            .get_mut(key)
            .ok_or_else(|| FrameloomError::validation("unknown entity"))?;
        let out = f(entity);
        entity.attach_notifier(&notifier);
        notifier.notify(FrameRange::UNBOUNDED);
        Ok(out)
    }

    /// Publish decoded pixels for an image box.
    pub fn set_image(&mut self, key: EntityKey, image: Arc<RasterImage>) -> FrameloomResult<()> {
        self.modify(key, |e| match &mut e.kind {
            BoxKind::Image(src) => {
                src.image = Some(image);
                Ok(())
            }
            _ => Err(FrameloomError::validation("entity is not an image box")),
        })?
    }

    /// Image boxes whose pixels are not loaded yet.
    pub fn pending_images(&self) -> Vec<(EntityKey, PathBuf)> {
        self.entities
            .iter()
            .filter_map(|(k, e)| match &e.kind {
                BoxKind::Image(src) if src.image.is_none() => Some((k, src.path.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn notifier(&self, key: EntityKey) -> ChangeNotifier {
        ChangeNotifier::new(key, self.changes_tx.clone())
    }

    /// Take every pending change notification.
    pub fn drain_changes(&self) -> Vec<ValueChanged> {
        self.changes_rx.try_iter().collect()
    }

    /// Frames around `frame` on which the whole scene renders identically.
    pub fn identical_range(&self, frame: i64) -> FrameRange {
        self.roots
            .iter()
            .fold(FrameRange::UNBOUNDED, |acc, &root| {
                acc.intersect(self.subtree_identical_range(root, frame))
            })
    }

    /// Identical range of `key` and everything below it.
    pub fn subtree_identical_range(&self, key: EntityKey, frame: i64) -> FrameRange {
        let mut range = FrameRange::UNBOUNDED;
        let mut stack = vec![key];
        while let Some(key) = stack.pop() {
            let Some(e) = self.entities.get(key) else {
                continue;
            };
            if e.visible_at(frame) {
                range = range.intersect(e.identical_rel_range(frame));
                stack.extend(e.children.iter().copied());
            } else {
                range = range.intersect(e.visibility_range(frame));
            }
        }
        range
    }

    fn notify_scene(&self) {
        self.notifier(EntityKey::null()).notify(FrameRange::UNBOUNDED);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
