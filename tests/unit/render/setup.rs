use super::*;
use crate::animation::key::Keyframe;
use crate::effects::animated::{EffectAnimator, EffectSlot};
use crate::foundation::core::{Rgba, Vec2};
use crate::scene::entity::ShapeSource;

fn square(size: f64, pos: Vec2) -> BoxEntity {
    let mut e = BoxEntity::path("sq", ShapeSource::rect(Vec2::new(size, size)));
    e.transform.position.set_base_value(pos);
    e
}

fn cx(scene: &Scene) -> SetupContext {
    SetupContext::new(HardwareResolver::cpu_only(), scene.canvas_rect())
}

#[test]
fn repeated_snapshots_have_equal_fingerprints() {
    let mut scene = Scene::new(100, 100);
    let mut e = square(10.0, Vec2::new(5.0, 5.0));
    e.transform.rotation.set_key(Keyframe::new(0, 0.0));
    e.transform.rotation.set_key(Keyframe::new(10, 90.0));
    let key = scene.add(e);

    let a = setup_render_data(&scene, key, 3, Affine::IDENTITY, &mut cx(&scene))
        .unwrap()
        .unwrap();
    let b = setup_render_data(&scene, key, 3, Affine::IDENTITY, &mut cx(&scene))
        .unwrap()
        .unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.total_transform, b.total_transform);

    let c = setup_render_data(&scene, key, 4, Affine::IDENTITY, &mut cx(&scene))
        .unwrap()
        .unwrap();
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn plain_path_is_direct_draw() {
    let mut scene = Scene::new(100, 100);
    let plain = scene.add(square(10.0, Vec2::ZERO));
    let mut forced = square(10.0, Vec2::ZERO);
    forced.force_rasterize = true;
    let forced = scene.add(forced);
    let mut blended = square(10.0, Vec2::ZERO);
    blended.blend_mode = BlendMode::Multiply;
    let blended = scene.add(blended);

    let mut cx = cx(&scene);
    let mut snap = |k| setup_render_data(&scene, k, 0, Affine::IDENTITY, &mut cx);
    assert!(snap(plain).unwrap().unwrap().direct_draw);
    assert!(!snap(forced).unwrap().unwrap().direct_draw);
    assert!(!snap(blended).unwrap().unwrap().direct_draw);
}

#[test]
fn global_rect_includes_margin_and_effects() {
    let mut scene = Scene::new(100, 100);
    let mut e = square(10.0, Vec2::new(20.0, 20.0));
    e.effects.push(EffectSlot::new(EffectAnimator::blur(3.0)));
    let key = scene.add(e);

    let data = setup_render_data(&scene, key, 0, Affine::IDENTITY, &mut cx(&scene))
        .unwrap()
        .unwrap();
    assert!(!data.direct_draw);
    assert_eq!(data.global_rect, PixelRect::new(15, 15, 35, 35));
}

#[test]
fn global_rect_is_clipped_to_canvas() {
    let mut scene = Scene::new(50, 50);
    let key = scene.add(square(100.0, Vec2::new(-20.0, 10.0)));
    let data = setup_render_data(&scene, key, 0, Affine::IDENTITY, &mut cx(&scene))
        .unwrap()
        .unwrap();
    assert_eq!(data.global_rect, PixelRect::new(0, 8, 50, 50));
}

#[test]
fn transparent_or_hidden_boxes_produce_nothing() {
    let mut scene = Scene::new(100, 100);
    let mut faded = square(10.0, Vec2::ZERO);
    faded.transform.opacity.set_base_value(0.0);
    let faded = scene.add(faded);
    let mut hidden = square(10.0, Vec2::ZERO);
    hidden.visibility = Some(FrameRange::new(5, 9));
    let hidden = scene.add(hidden);

    let mut cx = cx(&scene);
    assert!(setup_render_data(&scene, faded, 0, Affine::IDENTITY, &mut cx).unwrap().is_none());
    assert!(setup_render_data(&scene, hidden, 0, Affine::IDENTITY, &mut cx).unwrap().is_none());
    assert!(setup_render_data(&scene, hidden, 6, Affine::IDENTITY, &mut cx).unwrap().is_some());
}

#[test]
fn resolution_scales_pixel_rect() {
    let mut scene = Scene::new(100, 100);
    scene.set_resolution(0.5).unwrap();
    let key = scene.add(square(40.0, Vec2::new(20.0, 20.0)));
    let data = setup_render_data(&scene, key, 0, Affine::IDENTITY, &mut cx(&scene))
        .unwrap()
        .unwrap();
    assert_eq!(data.global_rect, PixelRect::new(8, 8, 32, 32));
    assert_eq!(data.resolution, 0.5);
}

#[test]
fn frame_plan_orders_children_before_parents() {
    let mut scene = Scene::new(100, 100);
    scene.set_background(Rgba::WHITE);
    let layer = scene.add(BoxEntity::layer("layer"));
    let mut blurred = square(10.0, Vec2::new(10.0, 10.0));
    blurred.effects.push(EffectSlot::new(EffectAnimator::blur(2.0)));
    scene.add_child(layer, blurred).unwrap();
    scene.add_child(layer, square(5.0, Vec2::ZERO)).unwrap();
    scene.add(square(5.0, Vec2::new(50.0, 50.0)));

    let plan = plan_frame(&scene, 0, HardwareResolver::cpu_only()).unwrap();
    assert_eq!(plan.jobs.len(), 3);
    assert_eq!(plan.jobs[0].data.dependencies(), Vec::<usize>::new());
    assert_eq!(plan.jobs[1].data.dependencies(), vec![0]);
    let root = plan.root().unwrap();
    assert_eq!(root.data.dependencies(), vec![1]);
    assert_eq!(root.data.global_rect, PixelRect::from_size(100, 100));
    assert!(plan.identical_range.is_unbounded());

    match &root.data.source {
        RenderSource::Container {
            background,
            children,
        } => {
            assert_eq!(*background, Some(Rgba::WHITE));
            assert_eq!(children.len(), 2);
            assert!(matches!(children[1], ChildRender::Direct(_)));
        }
        other => panic!("unexpected root source {other:?}"),
    }
}
