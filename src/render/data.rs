use std::sync::{Arc, OnceLock};

use kurbo::PathEl;
use smallvec::SmallVec;

use crate::effects::blend::BlendMode;
use crate::effects::effect::RasterEffect;
use crate::foundation::core::{Affine, BezPath, EntityKey, FrameRange, PixelRect, Rect, Rgba};
use crate::foundation::math::{Fingerprint, StableHasher};
use crate::render::image::RasterImage;

/// Write-once cell a render task publishes its finished snapshot into.
///
/// Parents read it only after the child task finished, so a set cell always holds
/// fully rendered data.
pub type RenderSlot = Arc<OnceLock<Arc<RenderData>>>;

/// Child of a container snapshot.
#[derive(Clone, Debug)]
pub enum ChildRender {
    /// Drawn straight into the parent surface; no task of its own.
    Direct(Arc<RenderData>),
    /// Rendered by its own task (job `job` of the frame plan) and published into `slot`.
    Rasterized {
        slot: RenderSlot,
        job: usize,
        fingerprint: Fingerprint,
    },
}

/// Content a snapshot draws.
#[derive(Clone, Debug)]
pub enum RenderSource {
    Path {
        /// Fill geometry in local coordinates.
        path: Arc<BezPath>,
        /// Stroke outline, already expanded into a fillable path.
        outline: Option<Arc<BezPath>>,
        fill: Option<Rgba>,
        stroke: Option<Rgba>,
    },
    Raster {
        image: Arc<RasterImage>,
    },
    Container {
        background: Option<Rgba>,
        children: Vec<ChildRender>,
    },
}

/// Immutable per-frame capture of everything one entity needs to rasterize.
///
/// Holds no reference into the live scene besides the entity key; resources are owned
/// copies or shared `Arc`s.
#[derive(Clone, Debug)]
pub struct RenderData {
    pub entity: EntityKey,
    pub rel_frame: i64,
    /// Local-to-canvas transform in unscaled canvas units.
    pub total_transform: Affine,
    pub resolution: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
    pub effects: SmallVec<[RasterEffect; 4]>,
    pub source: RenderSource,
    /// Content bounds in local coordinates.
    pub relative_bounds: Rect,
    /// Pixel rect the rendered image covers, in output pixels.
    pub global_rect: PixelRect,
    pub max_bounds: PixelRect,
    /// Whether the parent draws this directly instead of compositing a rendered image.
    pub direct_draw: bool,
    /// Frames on which this snapshot would be identical.
    pub identical_range: FrameRange,
    /// Rendered pixels covering `global_rect`, set once when the task finishes.
    pub image: Option<Arc<RasterImage>>,
}

impl RenderData {
    /// Local-to-pixel transform for drawing into a surface whose origin is `origin`.
    pub fn pixel_transform_at(&self, origin: PixelRect) -> Affine {
        Affine::translate((-f64::from(origin.x0), -f64::from(origin.y0)))
            * Affine::scale(self.resolution)
            * self.total_transform
    }

    /// Local-to-pixel transform for this snapshot's own surface.
    pub fn pixel_transform(&self) -> Affine {
        self.pixel_transform_at(self.global_rect)
    }

    pub fn is_rendered(&self) -> bool {
        self.image.is_some()
    }

    /// Indices of the frame-plan jobs this snapshot waits for.
    pub fn dependencies(&self) -> Vec<usize> {
        match &self.source {
            RenderSource::Container { children, .. } => children
                .iter()
                .filter_map(|c| match c {
                    ChildRender::Rasterized { job, .. } => Some(*job),
                    ChildRender::Direct(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Stable digest of the captured state, independent of whether it was rendered yet.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = StableHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }

    fn hash_into(&self, h: &mut StableHasher) {
        h.write_i64(self.rel_frame);
        for c in self.total_transform.as_coeffs() {
            h.write_f64(c);
        }
        h.write_f64(self.resolution);
        h.write_f64(self.opacity);
        h.write_u8(self.blend_mode as u8);
        h.write_u64(self.effects.len() as u64);
        for fx in &self.effects {
            fx.hash_into(h);
        }
        for v in [
            self.global_rect.x0,
            self.global_rect.y0,
            self.global_rect.x1,
            self.global_rect.y1,
        ] {
            h.write_i32(v);
        }
        h.write_bool(self.direct_draw);

        match &self.source {
            RenderSource::Path {
                path,
                outline,
                fill,
                stroke,
            } => {
                h.write_u8(0);
                hash_path(h, path);
                match outline {
                    Some(o) => {
                        h.write_u8(1);
                        hash_path(h, o);
                    }
                    None => h.write_u8(0),
                }
                hash_opt_color(h, *fill);
                hash_opt_color(h, *stroke);
            }
            RenderSource::Raster { image } => {
                h.write_u8(1);
                h.write_u32(image.width);
                h.write_u32(image.height);
                h.write_bytes(&image.data);
            }
            RenderSource::Container {
                background,
                children,
            } => {
                h.write_u8(2);
                hash_opt_color(h, *background);
                h.write_u64(children.len() as u64);
                for child in children {
                    match child {
                        ChildRender::Direct(d) => {
                            h.write_u8(0);
                            d.hash_into(h);
                        }
                        ChildRender::Rasterized { fingerprint, .. } => {
                            h.write_u8(1);
                            h.write_u64(fingerprint.hi);
                            h.write_u64(fingerprint.lo);
                        }
                    }
                }
            }
        }
    }
}

fn hash_opt_color(h: &mut StableHasher, c: Option<Rgba>) {
    match c {
        Some(c) => {
            h.write_u8(1);
            for v in [c.r, c.g, c.b, c.a] {
                h.write_f64(v);
            }
        }
        None => h.write_u8(0),
    }
}

fn hash_path(h: &mut StableHasher, path: &BezPath) {
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                h.write_u8(0);
                h.write_f64(p.x);
                h.write_f64(p.y);
            }
            PathEl::LineTo(p) => {
                h.write_u8(1);
                h.write_f64(p.x);
                h.write_f64(p.y);
            }
            PathEl::QuadTo(a, b) => {
                h.write_u8(2);
                for p in [a, b] {
                    h.write_f64(p.x);
                    h.write_f64(p.y);
                }
            }
            PathEl::CurveTo(a, b, c) => {
                h.write_u8(3);
                for p in [a, b, c] {
                    h.write_f64(p.x);
                    h.write_f64(p.y);
                }
            }
            PathEl::ClosePath => h.write_u8(4),
        }
    }
}
