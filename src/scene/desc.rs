//! JSON scene description used by the command line harness.
//!
//! This is a convenience format, not a project file: a description builds a [`Scene`],
//! but a live scene is never converted back into one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::composite::ColorAnimator;
use crate::animation::key::{Interpolation, Keyframe};
use crate::effects::animated::{EffectAnimator, EffectSlot};
use crate::effects::blend::BlendMode;
use crate::foundation::core::{BezPath, EntityKey, FrameRange, Rgba, Vec2};
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::scene::entity::{BoxEntity, PropertyKey, ShapeSource};
use crate::scene::model::Scene;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneDesc {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub background: Option<Rgba>,
    #[serde(default = "one")]
    pub resolution: f64,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_frames")]
    pub frames: FrameRange,
    #[serde(default)]
    pub items: Vec<ItemDesc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKindDesc {
    Rect {
        width: f64,
        height: f64,
        #[serde(default)]
        corner_radius: f64,
    },
    Ellipse {
        rx: f64,
        ry: f64,
    },
    /// SVG path data.
    Path {
        d: String,
    },
    Image {
        path: String,
    },
    Layer {
        #[serde(default)]
        children: Vec<ItemDesc>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDesc {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: ItemKindDesc,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 2],
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub pivot: [f64; 2],
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default)]
    pub fill: Option<Rgba>,
    #[serde(default)]
    pub stroke: Option<Rgba>,
    #[serde(default = "one")]
    pub stroke_width: f64,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub effects: Vec<EffectDesc>,
    #[serde(default)]
    pub force_rasterize: bool,
    #[serde(default)]
    pub visible_frames: Option<FrameRange>,
    #[serde(default)]
    pub keys: Vec<KeyDesc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectDesc {
    Blur {
        radius: f64,
    },
    Shadow {
        blur: f64,
        offset: [f64; 2],
        color: Rgba,
        #[serde(default = "one")]
        opacity: f64,
    },
    Brightness {
        amount: f64,
    },
    Contrast {
        amount: f64,
    },
    Tint {
        color: Rgba,
        amount: f64,
    },
}

/// Keyframe on a named channel, e.g. `position.x`, `rotation`, `fill.a`, `blur.radius`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyDesc {
    pub channel: String,
    /// Restrict the lookup to the effect at this index.
    #[serde(default)]
    pub effect: Option<usize>,
    pub frame: i64,
    pub value: f64,
    #[serde(default)]
    pub interpolation: Interpolation,
}

fn one() -> f64 {
    1.0
}

fn unit_scale() -> [f64; 2] {
    [1.0, 1.0]
}

fn default_fps() -> f64 {
    24.0
}

fn default_frames() -> FrameRange {
    FrameRange::new(0, 0)
}

impl SceneDesc {
    pub fn from_json(text: &str) -> FrameloomResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> FrameloomResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> FrameloomResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FrameloomError::resource(format!("read scene '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Build a scene. Image paths are resolved against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> FrameloomResult<Scene> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameloomError::validation("scene size must be non-zero"));
        }
        let mut scene = Scene::new(self.width, self.height);
        scene.set_resolution(self.resolution)?;
        scene.set_fps(self.fps)?;
        scene.set_frame_range(self.frames)?;
        if let Some(bg) = self.background {
            scene.set_background(bg);
        }
        for item in &self.items {
            add_item(&mut scene, None, item, base_dir)?;
        }
        // Construction is not an edit.
        let _ = scene.drain_changes();
        Ok(scene)
    }
}

fn add_item(
    scene: &mut Scene,
    parent: Option<EntityKey>,
    item: &ItemDesc,
    base_dir: &Path,
) -> FrameloomResult<()> {
    let mut entity = match &item.kind {
        ItemKindDesc::Rect {
            width,
            height,
            corner_radius,
        } => {
            let mut shape = ShapeSource::rect(Vec2::new(*width, *height));
            if let ShapeSource::Rect {
                corner_radius: r, ..
            } = &mut shape
            {
                r.set_base_value(*corner_radius);
            }
            BoxEntity::path(&item.name, shape)
        }
        ItemKindDesc::Ellipse { rx, ry } => {
            BoxEntity::path(&item.name, ShapeSource::ellipse(Vec2::new(*rx, *ry)))
        }
        ItemKindDesc::Path { d } => {
            let path = BezPath::from_svg(d).map_err(|e| {
                FrameloomError::validation(format!("item '{}': bad path data: {e}", item.name))
            })?;
            BoxEntity::path(&item.name, ShapeSource::custom(path))
        }
        ItemKindDesc::Image { path } => BoxEntity::image(&item.name, base_dir.join(path)),
        ItemKindDesc::Layer { .. } => BoxEntity::layer(&item.name),
    };

    let t = &mut entity.transform;
    t.position.set_base_value(Vec2::new(item.position[0], item.position[1]));
    t.scale.set_base_value(Vec2::new(item.scale[0], item.scale[1]));
    t.pivot.set_base_value(Vec2::new(item.pivot[0], item.pivot[1]));
    t.rotation.set_base_value(item.rotation);
    t.opacity.set_base_value(item.opacity);

    entity.paint.fill = item.fill.map(|c| ColorAnimator::new("fill", c));
    entity.paint.stroke = item.stroke.map(|c| ColorAnimator::new("stroke", c));
    entity.paint.stroke_width.set_base_value(item.stroke_width);
    entity.blend_mode = item.blend_mode;
    entity.force_rasterize = item.force_rasterize;
    entity.visibility = item.visible_frames;
    entity.effects = item
        .effects
        .iter()
        .map(|fx| EffectSlot::new(effect_animator(fx)))
        .collect();

    for key in &item.keys {
        let channel = find_channel(&mut entity, key).ok_or_else(|| {
            FrameloomError::validation(format!(
                "item '{}': unknown channel '{}'",
                item.name, key.channel
            ))
        })?;
        channel.set_key(Keyframe::new(key.frame, key.value).with_interpolation(key.interpolation));
    }

    let key = match parent {
        Some(p) => scene.add_child(p, entity)?,
        None => scene.add(entity),
    };
    if let ItemKindDesc::Layer { children } = &item.kind {
        for child in children {
            add_item(scene, Some(key), child, base_dir)?;
        }
    }
    Ok(())
}

fn effect_animator(desc: &EffectDesc) -> EffectAnimator {
    match *desc {
        EffectDesc::Blur { radius } => EffectAnimator::blur(radius),
        EffectDesc::Shadow {
            blur,
            offset,
            color,
            opacity,
        } => EffectAnimator::shadow(blur, Vec2::new(offset[0], offset[1]), color, opacity),
        EffectDesc::Brightness { amount } => EffectAnimator::brightness(amount),
        EffectDesc::Contrast { amount } => EffectAnimator::contrast(amount),
        EffectDesc::Tint { color, amount } => EffectAnimator::tint(color, amount),
    }
}

fn find_channel<'a>(
    entity: &'a mut BoxEntity,
    key: &KeyDesc,
) -> Option<&'a mut crate::animation::scalar::ScalarAnimator> {
    let candidates: Vec<PropertyKey> = match key.effect {
        Some(i) => vec![PropertyKey::Effect(i)],
        None => vec![
            PropertyKey::Transform,
            PropertyKey::Fill,
            PropertyKey::Stroke,
            PropertyKey::StrokeWidth,
            PropertyKey::Shape,
        ],
    };
    let owner = candidates.into_iter().find(|&p| {
        entity
            .property(p)
            .is_some_and(|g| g.channels().iter().any(|c| c.name() == key.channel))
    })?;
    entity
        .property_mut(owner)?
        .channels_mut()
        .into_iter()
        .find(|c| c.name() == key.channel)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/desc.rs"]
mod tests;
