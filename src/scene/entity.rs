use std::path::PathBuf;
use std::sync::Arc;

use kurbo::Shape as _;

use crate::animation::composite::{ChannelGroup, ColorAnimator, Vec2Animator};
use crate::animation::notify::ChangeNotifier;
use crate::animation::scalar::ScalarAnimator;
use crate::animation::transform::TransformAnimator;
use crate::effects::animated::EffectSlot;
use crate::effects::blend::BlendMode;
use crate::foundation::core::{BezPath, EntityKey, FrameRange, Point, Rect, Rgba, Vec2};
use crate::render::image::RasterImage;

const PATH_TOLERANCE: f64 = 0.1;

/// Geometry of a path box, in local coordinates.
#[derive(Clone, Debug)]
pub enum ShapeSource {
    /// Rectangle from the origin, optionally rounded.
    Rect {
        size: Vec2Animator,
        corner_radius: ScalarAnimator,
    },
    /// Ellipse centered on the origin.
    Ellipse { radii: Vec2Animator },
    /// Fixed outline.
    Custom(Arc<BezPath>),
}

impl ShapeSource {
    pub fn rect(size: Vec2) -> Self {
        Self::Rect {
            size: Vec2Animator::new("size", size),
            corner_radius: ScalarAnimator::new("corner_radius", 0.0).with_range(0.0, f64::MAX),
        }
    }

    pub fn ellipse(radii: Vec2) -> Self {
        Self::Ellipse {
            radii: Vec2Animator::new("radii", radii),
        }
    }

    pub fn custom(path: BezPath) -> Self {
        Self::Custom(Arc::new(path))
    }

    /// Outline at `frame`. Custom paths are shared, generated shapes are built fresh.
    pub fn path_at(&self, frame: f64) -> Arc<BezPath> {
        match self {
            Self::Rect {
                size,
                corner_radius,
            } => {
                let s = size.effective_value(frame);
                let rect = Rect::new(0.0, 0.0, s.x.max(0.0), s.y.max(0.0));
                let r = corner_radius
                    .effective_value(frame)
                    .min(rect.width().min(rect.height()) / 2.0);
                if r > 0.0 {
                    Arc::new(rect.to_rounded_rect(r).to_path(PATH_TOLERANCE))
                } else {
                    Arc::new(rect.to_path(PATH_TOLERANCE))
                }
            }
            Self::Ellipse { radii } => {
                let r = radii.effective_value(frame);
                let ellipse = kurbo::Ellipse::new(Point::ZERO, (r.x.abs(), r.y.abs()), 0.0);
                Arc::new(ellipse.to_path(PATH_TOLERANCE))
            }
            Self::Custom(path) => Arc::clone(path),
        }
    }
}

impl ChannelGroup for ShapeSource {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        match self {
            Self::Rect {
                size,
                corner_radius,
            } => {
                let mut out = size.channels();
                out.push(corner_radius);
                out
            }
            Self::Ellipse { radii } => radii.channels(),
            Self::Custom(_) => Vec::new(),
        }
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        match self {
            Self::Rect {
                size,
                corner_radius,
            } => {
                let mut out = size.channels_mut();
                out.push(corner_radius);
                out
            }
            Self::Ellipse { radii } => radii.channels_mut(),
            Self::Custom(_) => Vec::new(),
        }
    }
}

/// Fill and stroke settings of a path box.
#[derive(Clone, Debug)]
pub struct Paint {
    pub fill: Option<ColorAnimator>,
    pub stroke: Option<ColorAnimator>,
    pub stroke_width: ScalarAnimator,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: Some(ColorAnimator::new("fill", Rgba::BLACK)),
            stroke: None,
            stroke_width: ScalarAnimator::new("stroke_width", 1.0).with_range(0.0, f64::MAX),
        }
    }
}

/// Image file reference; the decoded pixels arrive later through a disk task.
#[derive(Clone, Debug)]
pub struct ImageSource {
    pub path: PathBuf,
    pub image: Option<Arc<RasterImage>>,
}

/// What an entity draws.
#[derive(Clone, Debug)]
pub enum BoxKind {
    Path(ShapeSource),
    Image(ImageSource),
    /// Group whose children are composited into one surface.
    Layer,
}

/// Addressable animated property of a box, used for undo entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Every transform channel at once.
    Transform,
    Position,
    Scale,
    Rotation,
    Pivot,
    Shear,
    Opacity,
    Fill,
    Stroke,
    StrokeWidth,
    /// Generated shape parameters (rect size and corner radius, ellipse radii).
    Shape,
    /// Parameters of the effect at this index.
    Effect(usize),
}

/// A node of the scene tree.
#[derive(Clone, Debug)]
pub struct BoxEntity {
    pub name: String,
    pub kind: BoxKind,
    pub transform: TransformAnimator,
    pub paint: Paint,
    pub blend_mode: BlendMode,
    pub effects: Vec<EffectSlot>,
    /// Always rasterize, even when a direct draw would do.
    pub force_rasterize: bool,
    pub visible: bool,
    /// Frames on which the box exists; `None` means always.
    pub visibility: Option<FrameRange>,
    pub(crate) parent: Option<EntityKey>,
    pub(crate) children: Vec<EntityKey>,
}

impl BoxEntity {
    pub fn new(name: impl Into<String>, kind: BoxKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: TransformAnimator::default(),
            paint: Paint::default(),
            blend_mode: BlendMode::SrcOver,
            effects: Vec::new(),
            force_rasterize: false,
            visible: true,
            visibility: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn path(name: impl Into<String>, shape: ShapeSource) -> Self {
        Self::new(name, BoxKind::Path(shape))
    }

    pub fn image(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(
            name,
            BoxKind::Image(ImageSource {
                path: path.into(),
                image: None,
            }),
        )
    }

    pub fn layer(name: impl Into<String>) -> Self {
        Self::new(name, BoxKind::Layer)
    }

    pub fn is_layer(&self) -> bool {
        matches!(self.kind, BoxKind::Layer)
    }

    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    /// Whether the box is drawn at `frame`.
    pub fn visible_at(&self, frame: i64) -> bool {
        self.visible && self.visibility.is_none_or(|r| r.contains(frame))
    }

    /// Frames around `frame` on which [`BoxEntity::visible_at`] does not change.
    pub fn visibility_range(&self, frame: i64) -> FrameRange {
        let Some(r) = self.visibility else {
            return FrameRange::UNBOUNDED;
        };
        if r.contains(frame) {
            r
        } else if frame < r.min {
            FrameRange::new(i64::MIN, r.min - 1)
        } else {
            FrameRange::new(r.max.saturating_add(1), i64::MAX)
        }
    }

    pub fn property(&self, key: PropertyKey) -> Option<&dyn ChannelGroup> {
        let group: &dyn ChannelGroup = match key {
            PropertyKey::Transform => &self.transform,
            PropertyKey::Position => &self.transform.position,
            PropertyKey::Scale => &self.transform.scale,
            PropertyKey::Rotation => &self.transform.rotation,
            PropertyKey::Pivot => &self.transform.pivot,
            PropertyKey::Shear => &self.transform.shear,
            PropertyKey::Opacity => &self.transform.opacity,
            PropertyKey::Fill => self.paint.fill.as_ref()?,
            PropertyKey::Stroke => self.paint.stroke.as_ref()?,
            PropertyKey::StrokeWidth => &self.paint.stroke_width,
            PropertyKey::Shape => match &self.kind {
                BoxKind::Path(shape) => shape,
                _ => return None,
            },
            PropertyKey::Effect(i) => &self.effects.get(i)?.effect,
        };
        Some(group)
    }

    pub fn property_mut(&mut self, key: PropertyKey) -> Option<&mut dyn ChannelGroup> {
        let group: &mut dyn ChannelGroup = match key {
            PropertyKey::Transform => &mut self.transform,
            PropertyKey::Position => &mut self.transform.position,
            PropertyKey::Scale => &mut self.transform.scale,
            PropertyKey::Rotation => &mut self.transform.rotation,
            PropertyKey::Pivot => &mut self.transform.pivot,
            PropertyKey::Shear => &mut self.transform.shear,
            PropertyKey::Opacity => &mut self.transform.opacity,
            PropertyKey::Fill => self.paint.fill.as_mut()?,
            PropertyKey::Stroke => self.paint.stroke.as_mut()?,
            PropertyKey::StrokeWidth => &mut self.paint.stroke_width,
            PropertyKey::Shape => match &mut self.kind {
                BoxKind::Path(shape) => shape,
                _ => return None,
            },
            PropertyKey::Effect(i) => &mut self.effects.get_mut(i)?.effect,
        };
        Some(group)
    }

    /// Every animated channel group the box owns.
    pub fn animated_groups(&self) -> Vec<&dyn ChannelGroup> {
        let mut out: Vec<&dyn ChannelGroup> = vec![&self.transform, &self.paint.stroke_width];
        if let Some(fill) = &self.paint.fill {
            out.push(fill);
        }
        if let Some(stroke) = &self.paint.stroke {
            out.push(stroke);
        }
        if let BoxKind::Path(shape) = &self.kind {
            out.push(shape);
        }
        out.extend(
            self.effects
                .iter()
                .filter(|s| s.visible)
                .map(|s| &s.effect as &dyn ChannelGroup),
        );
        out
    }

    /// Frames around `frame` on which this box alone (not its children) renders identically.
    pub fn identical_rel_range(&self, frame: i64) -> FrameRange {
        self.animated_groups()
            .iter()
            .fold(self.visibility_range(frame), |acc, g| {
                acc.intersect(g.identical_rel_range(frame))
            })
    }

    pub(crate) fn attach_notifier(&mut self, notifier: &ChangeNotifier) {
        self.transform.attach_notifier(notifier);
        self.paint.stroke_width.attach_notifier(notifier.clone());
        if let Some(fill) = &mut self.paint.fill {
            fill.attach_notifier(notifier);
        }
        if let Some(stroke) = &mut self.paint.stroke {
            stroke.attach_notifier(notifier);
        }
        if let BoxKind::Path(shape) = &mut self.kind {
            shape.attach_notifier(notifier);
        }
        for slot in &mut self.effects {
            slot.effect.attach_notifier(notifier);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/entity.rs"]
mod tests;
