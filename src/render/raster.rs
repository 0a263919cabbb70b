use std::sync::Arc;

use crate::effects::blend::{composite_at, over_in_place};
use crate::foundation::core::{Affine, BezPath, PixelRect, Point, Rgba};
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::render::data::{ChildRender, RenderData, RenderSource};
use crate::render::image::RasterImage;
use crate::task::cancel::CancelToken;

/// Rasterize a snapshot's own content into an image covering its `global_rect`.
///
/// The snapshot's opacity and blend mode are not applied here; the parent applies them when
/// compositing. Container children must already be published.
pub fn rasterize(data: &RenderData, cancel: &CancelToken) -> FrameloomResult<RasterImage> {
    let rect = data.global_rect;
    match &data.source {
        RenderSource::Path { .. } | RenderSource::Raster { .. } => {
            let mut surface = Surface::new(rect)?;
            surface.draw(data, 1.0)?;
            surface.finish()
        }
        RenderSource::Container {
            background,
            children,
        } => compose_children(rect, *background, children, cancel),
    }
}

fn compose_children(
    rect: PixelRect,
    background: Option<Rgba>,
    children: &[ChildRender],
    cancel: &CancelToken,
) -> FrameloomResult<RasterImage> {
    let mut out = match background {
        Some(bg) => RasterImage::filled(rect.width(), rect.height(), bg.to_premul8(1.0)),
        None => RasterImage::new(rect.width(), rect.height()),
    };
    let mut direct: Vec<&RenderData> = Vec::new();
    for child in children {
        match child {
            ChildRender::Direct(d) => direct.push(d),
            ChildRender::Rasterized { slot, .. } => {
                flush_direct(&mut out, rect, &direct)?;
                direct.clear();
                cancel.checkpoint()?;
                let done = slot
                    .get()
                    .ok_or_else(|| FrameloomError::render("child snapshot was not published"))?;
                let Some(image) = &done.image else {
                    continue;
                };
                composite_at(
                    &mut out,
                    rect,
                    image,
                    done.global_rect,
                    done.opacity as f32,
                    done.blend_mode,
                )?;
            }
        }
    }
    flush_direct(&mut out, rect, &direct)?;
    Ok(out)
}

/// Draw a run of direct-draw children in one pass and lay it over `out`.
fn flush_direct(out: &mut RasterImage, rect: PixelRect, direct: &[&RenderData]) -> FrameloomResult<()> {
    if direct.is_empty() {
        return Ok(());
    }
    let mut surface = Surface::new(rect)?;
    for d in direct {
        surface.draw(d, d.opacity as f32)?;
    }
    let layer = surface.finish()?;
    over_in_place(&mut out.data, &layer.data, 1.0)
}

/// vello_cpu render context plus the pixel rect it covers.
struct Surface {
    rect: PixelRect,
    ctx: vello_cpu::RenderContext,
    width: u16,
    height: u16,
}

impl Surface {
    fn new(rect: PixelRect) -> FrameloomResult<Self> {
        let width: u16 = rect
            .width()
            .try_into()
            .map_err(|_| FrameloomError::render("surface width exceeds u16"))?;
        let height: u16 = rect
            .height()
            .try_into()
            .map_err(|_| FrameloomError::render("surface height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(FrameloomError::render("empty render surface"));
        }
        Ok(Self {
            rect,
            ctx: vello_cpu::RenderContext::new(width, height),
            width,
            height,
        })
    }

    fn draw(&mut self, data: &RenderData, opacity: f32) -> FrameloomResult<()> {
        let ctx = &mut self.ctx;
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(affine_to_cpu(data.pixel_transform_at(self.rect)));
        if opacity < 1.0 {
            ctx.push_opacity_layer(opacity);
        }
        match &data.source {
            RenderSource::Path {
                path,
                outline,
                fill,
                stroke,
            } => {
                if let Some(color) = fill {
                    ctx.set_paint(color_to_cpu(*color));
                    ctx.fill_path(&bezpath_to_cpu(path));
                }
                if let (Some(outline), Some(color)) = (outline, stroke) {
                    ctx.set_paint(color_to_cpu(*color));
                    ctx.fill_path(&bezpath_to_cpu(outline));
                }
            }
            RenderSource::Raster { image } => {
                let pixmap = image_to_pixmap(image)?;
                ctx.set_paint(vello_cpu::Image {
                    image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                    sampler: vello_cpu::peniko::ImageSampler::default(),
                });
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(image.width),
                    f64::from(image.height),
                ));
            }
            RenderSource::Container { .. } => {
                if opacity < 1.0 {
                    ctx.pop_layer();
                }
                return Err(FrameloomError::render("containers are never drawn directly"));
            }
        }
        if opacity < 1.0 {
            ctx.pop_layer();
        }
        Ok(())
    }

    fn finish(mut self) -> FrameloomResult<RasterImage> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        RasterImage::from_premul(
            u32::from(self.width),
            u32::from(self.height),
            pixmap.data_as_u8_slice().to_vec(),
        )
    }
}

fn color_to_cpu(c: Rgba) -> vello_cpu::peniko::Color {
    let [r, g, b, a] = c.to_rgba8();
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_to_pixmap(image: &RasterImage) -> FrameloomResult<vello_cpu::Pixmap> {
    let w: u16 = image
        .width
        .try_into()
        .map_err(|_| FrameloomError::render("image width exceeds u16"))?;
    let h: u16 = image
        .height
        .try_into()
        .map_err(|_| FrameloomError::render("image height exceeds u16"))?;
    let mut may_have_opacities = false;
    let pixels = image
        .data
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
