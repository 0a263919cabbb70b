use std::sync::{Arc, OnceLock};

use kurbo::{Shape as _, Stroke, StrokeOpts};
use smallvec::SmallVec;

use crate::effects::blend::BlendMode;
use crate::effects::effect::RasterEffect;
use crate::effects::renderer::EffectsRenderer;
use crate::foundation::core::{Affine, EntityKey, FrameRange, PixelRect, Rect};
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::render::data::{ChildRender, RenderData, RenderSlot, RenderSource};
use crate::scene::entity::{BoxEntity, BoxKind};
use crate::scene::model::Scene;
use crate::task::hardware::HardwareResolver;

const MIN_VISIBLE_OPACITY: f64 = 0.001;
const AA_MARGIN: i32 = 2;
const STROKE_TOLERANCE: f64 = 0.05;

/// Snapshot waiting for its own render task.
#[derive(Debug)]
pub struct PlannedJob {
    pub data: RenderData,
    pub slot: RenderSlot,
}

/// Shared state of one snapshot pass: placement rules, bounds and the jobs it produced.
#[derive(Debug)]
pub struct SetupContext {
    pub resolver: HardwareResolver,
    pub max_bounds: PixelRect,
    /// Rasterized descendants, children before parents.
    pub jobs: Vec<PlannedJob>,
}

impl SetupContext {
    pub fn new(resolver: HardwareResolver, max_bounds: PixelRect) -> Self {
        Self {
            resolver,
            max_bounds,
            jobs: Vec::new(),
        }
    }
}

/// Every job needed to render one frame. The last job is the root.
#[derive(Debug)]
pub struct FramePlan {
    pub frame: i64,
    pub jobs: Vec<PlannedJob>,
    pub identical_range: FrameRange,
}

impl FramePlan {
    pub fn root(&self) -> Option<&PlannedJob> {
        self.jobs.last()
    }
}

/// Snapshot `entity` at `rel_frame`.
///
/// Reads every animator once and copies the values out; shapes and images are shared by
/// `Arc`. Layer children that need their own raster pass are pushed onto `cx.jobs` and
/// referenced by slot. Returns `None` when nothing would be drawn.
#[tracing::instrument(level = "trace", skip(scene, cx, parent_transform))]
pub fn setup_render_data(
    scene: &Scene,
    entity: EntityKey,
    rel_frame: i64,
    parent_transform: Affine,
    cx: &mut SetupContext,
) -> FrameloomResult<Option<RenderData>> {
    let e = scene
        .get(entity)
        .ok_or_else(|| FrameloomError::evaluation("snapshot of an unknown entity"))?;
    if !e.visible_at(rel_frame) {
        return Ok(None);
    }
    let t = rel_frame as f64;
    let opacity = e.transform.opacity(t);
    if opacity < MIN_VISIBLE_OPACITY {
        return Ok(None);
    }
    let total_transform = parent_transform * e.transform.relative_transform(t);
    let resolution = scene.resolution();
    let scaled = Affine::scale(resolution) * total_transform;

    let effects: SmallVec<[RasterEffect; 4]> = e
        .effects
        .iter()
        .filter(|s| s.visible)
        .map(|s| s.effect.evaluate(t, resolution))
        .filter(|fx| !fx.is_noop())
        .collect();

    let (source, relative_bounds, base_rect) = match &e.kind {
        BoxKind::Path(shape) => {
            let path = shape.path_at(t);
            let fill = e.paint.fill.as_ref().map(|c| c.effective_value(t));
            let stroke = e.paint.stroke.as_ref().map(|c| c.effective_value(t));
            let width = e.paint.stroke_width.effective_value(t);
            let outline = match stroke {
                Some(_) if width > 0.0 => Some(Arc::new(kurbo::stroke(
                    path.iter(),
                    &Stroke::new(width),
                    &StrokeOpts::default(),
                    STROKE_TOLERANCE,
                ))),
                _ => None,
            };
            let mut bounds = if fill.is_some() {
                path.bounding_box()
            } else {
                Rect::ZERO
            };
            if let Some(o) = &outline {
                bounds = if fill.is_some() {
                    bounds.union(o.bounding_box())
                } else {
                    o.bounding_box()
                };
            }
            if fill.is_none() && outline.is_none() {
                return Ok(None);
            }
            let rect = PixelRect::covering(scaled.transform_rect_bbox(bounds)).inflate(AA_MARGIN);
            (
                RenderSource::Path {
                    path,
                    outline,
                    fill,
                    stroke,
                },
                bounds,
                rect,
            )
        }
        BoxKind::Image(src) => {
            let Some(image) = &src.image else {
                tracing::trace!(path = %src.path.display(), "image not loaded, skipped");
                return Ok(None);
            };
            let bounds = Rect::new(0.0, 0.0, f64::from(image.width), f64::from(image.height));
            let rect = PixelRect::covering(scaled.transform_rect_bbox(bounds)).inflate(AA_MARGIN);
            (
                RenderSource::Raster {
                    image: Arc::clone(image),
                },
                bounds,
                rect,
            )
        }
        BoxKind::Layer => {
            let children = snapshot_children(scene, e, rel_frame, total_transform, cx)?;
            let rect = children_rect(&children, cx);
            (
                RenderSource::Container {
                    background: None,
                    children,
                },
                Rect::ZERO,
                rect,
            )
        }
    };

    let direct_draw = !e.force_rasterize
        && effects.is_empty()
        && e.blend_mode == BlendMode::SrcOver
        && matches!(source, RenderSource::Path { .. });

    let global_rect = if effects.is_empty() {
        base_rect.intersect(cx.max_bounds)
    } else {
        EffectsRenderer::new(effects.iter().copied(), cx.resolver)
            .set_base_global_rect(base_rect, cx.max_bounds)
    };
    if global_rect.is_empty() {
        return Ok(None);
    }

    Ok(Some(RenderData {
        entity,
        rel_frame,
        total_transform,
        resolution,
        opacity,
        blend_mode: e.blend_mode,
        effects,
        source,
        relative_bounds,
        global_rect,
        max_bounds: cx.max_bounds,
        direct_draw,
        identical_range: scene.subtree_identical_range(entity, rel_frame),
        image: None,
    }))
}

/// Snapshot the whole scene at `frame` into a dependency-ordered job list.
///
/// The root job is a canvas-sized container with the scene background.
#[tracing::instrument(level = "debug", skip(scene, resolver))]
pub fn plan_frame(scene: &Scene, frame: i64, resolver: HardwareResolver) -> FrameloomResult<FramePlan> {
    let canvas = scene.canvas_rect();
    let mut cx = SetupContext::new(resolver, canvas);
    let mut children = Vec::new();
    for &root in scene.roots() {
        if let Some(child) = snapshot_child(scene, root, frame, Affine::IDENTITY, &mut cx)? {
            children.push(child);
        }
    }
    let background = scene.background();
    let root = RenderData {
        entity: <EntityKey as slotmap::Key>::null(),
        rel_frame: frame,
        total_transform: Affine::IDENTITY,
        resolution: scene.resolution(),
        opacity: 1.0,
        blend_mode: BlendMode::SrcOver,
        effects: SmallVec::new(),
        source: RenderSource::Container {
            background: (background.a > 0.0).then_some(background),
            children,
        },
        relative_bounds: Rect::new(0.0, 0.0, f64::from(scene.width()), f64::from(scene.height())),
        global_rect: canvas,
        max_bounds: canvas,
        direct_draw: false,
        identical_range: scene.identical_range(frame),
        image: None,
    };
    let identical_range = root.identical_range;
    cx.jobs.push(PlannedJob {
        data: root,
        slot: Arc::new(OnceLock::new()),
    });
    tracing::debug!(frame, jobs = cx.jobs.len(), "frame planned");
    Ok(FramePlan {
        frame,
        jobs: cx.jobs,
        identical_range,
    })
}

fn snapshot_children(
    scene: &Scene,
    parent: &BoxEntity,
    rel_frame: i64,
    transform: Affine,
    cx: &mut SetupContext,
) -> FrameloomResult<Vec<ChildRender>> {
    let mut out = Vec::with_capacity(parent.children().len());
    for &child in parent.children() {
        if let Some(c) = snapshot_child(scene, child, rel_frame, transform, cx)? {
            out.push(c);
        }
    }
    Ok(out)
}

fn snapshot_child(
    scene: &Scene,
    key: EntityKey,
    rel_frame: i64,
    parent_transform: Affine,
    cx: &mut SetupContext,
) -> FrameloomResult<Option<ChildRender>> {
    let Some(data) = setup_render_data(scene, key, rel_frame, parent_transform, cx)? else {
        return Ok(None);
    };
    if data.direct_draw {
        return Ok(Some(ChildRender::Direct(Arc::new(data))));
    }
    let slot: RenderSlot = Arc::new(OnceLock::new());
    let fingerprint = data.fingerprint();
    cx.jobs.push(PlannedJob {
        data,
        slot: Arc::clone(&slot),
    });
    Ok(Some(ChildRender::Rasterized {
        slot,
        job: cx.jobs.len() - 1,
        fingerprint,
    }))
}

fn children_rect(children: &[ChildRender], cx: &SetupContext) -> PixelRect {
    children
        .iter()
        .map(|c| match c {
            ChildRender::Direct(d) => d.global_rect,
            ChildRender::Rasterized { job, .. } => cx.jobs[*job].data.global_rect,
        })
        .fold(PixelRect::default(), PixelRect::union)
}

#[cfg(test)]
#[path = "../../tests/unit/render/setup.rs"]
mod tests;
