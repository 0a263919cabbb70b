use super::*;
use crate::effects::animated::{EffectAnimator, EffectSlot};
use crate::effects::blend::BlendMode;
use crate::effects::renderer::EffectsRenderer;
use crate::foundation::core::Vec2;
use crate::render::setup::{FramePlan, plan_frame};
use crate::scene::entity::{BoxEntity, ShapeSource};
use crate::scene::model::Scene;
use crate::task::hardware::HardwareResolver;

fn rect(size: f64, pos: Vec2, color: Rgba) -> BoxEntity {
    let mut e = BoxEntity::path("r", ShapeSource::rect(Vec2::new(size, size)));
    e.transform.position.set_base_value(pos);
    e.paint.fill = Some(crate::animation::composite::ColorAnimator::new("fill", color));
    e
}

fn render(plan: FramePlan) -> Arc<RasterImage> {
    let cancel = CancelToken::new();
    let mut last = None;
    for job in plan.jobs {
        let mut data = job.data;
        let mut image = rasterize(&data, &cancel).unwrap();
        let mut fx = EffectsRenderer::new(data.effects.iter().copied(), HardwareResolver::cpu_only());
        while !fx.is_empty() {
            fx.process_cpu(&mut image, &cancel).unwrap();
        }
        data.image = Some(Arc::new(image));
        let data = Arc::new(data);
        job.slot.set(Arc::clone(&data)).unwrap();
        last = Some(data);
    }
    last.unwrap().image.clone().unwrap()
}

#[test]
fn direct_draw_fills_interior() {
    let mut scene = Scene::new(20, 20);
    scene.set_background(Rgba::WHITE);
    scene.add(rect(10.0, Vec2::new(5.0, 5.0), Rgba::new(1.0, 0.0, 0.0, 1.0)));
    let img = render(plan_frame(&scene, 0, HardwareResolver::cpu_only()).unwrap());
    assert_eq!((img.width, img.height), (20, 20));
    assert_eq!(img.pixel(10, 10), Some([255, 0, 0, 255]));
    assert_eq!(img.pixel(1, 1), Some([255, 255, 255, 255]));
}

#[test]
fn direct_draw_applies_opacity() {
    let mut scene = Scene::new(20, 20);
    let mut e = rect(10.0, Vec2::new(5.0, 5.0), Rgba::new(1.0, 0.0, 0.0, 1.0));
    e.transform.opacity.set_base_value(0.5);
    scene.add(e);
    let img = render(plan_frame(&scene, 0, HardwareResolver::cpu_only()).unwrap());
    let px = img.pixel(10, 10).unwrap();
    assert!((i32::from(px[3]) - 128).abs() <= 2, "{px:?}");
    assert_eq!(px[1], 0);
}

#[test]
fn rasterized_child_is_composited_with_blend_mode() {
    let mut scene = Scene::new(20, 20);
    scene.set_background(Rgba::new(0.0, 1.0, 1.0, 1.0));
    let mut e = rect(10.0, Vec2::new(5.0, 5.0), Rgba::new(1.0, 1.0, 0.0, 1.0));
    e.blend_mode = BlendMode::Multiply;
    scene.add(e);
    let plan = plan_frame(&scene, 0, HardwareResolver::cpu_only()).unwrap();
    assert_eq!(plan.jobs.len(), 2);
    let img = render(plan);
    assert_eq!(img.pixel(10, 10), Some([0, 255, 0, 255]));
    assert_eq!(img.pixel(1, 1), Some([0, 255, 255, 255]));
}

#[test]
fn blurred_child_bleeds_outside_its_shape() {
    let mut scene = Scene::new(40, 40);
    let mut e = rect(10.0, Vec2::new(15.0, 15.0), Rgba::BLACK);
    e.effects.push(EffectSlot::new(EffectAnimator::blur(4.0)));
    scene.add(e);
    let img = render(plan_frame(&scene, 0, HardwareResolver::cpu_only()).unwrap());
    let outside = img.pixel(13, 20).unwrap();
    assert!(outside[3] > 0 && outside[3] < 255, "{outside:?}");
    assert_eq!(img.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn unpublished_child_is_an_error() {
    let mut scene = Scene::new(20, 20);
    let mut e = rect(4.0, Vec2::ZERO, Rgba::BLACK);
    e.force_rasterize = true;
    scene.add(e);
    let plan = plan_frame(&scene, 0, HardwareResolver::cpu_only()).unwrap();
    let root = plan.root().unwrap();
    assert!(rasterize(&root.data, &CancelToken::new()).is_err());
}
