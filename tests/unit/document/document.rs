use super::*;
use crate::animation::composite::ColorAnimator;
use crate::animation::key::Keyframe;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Rgba, Vec2};
use crate::scene::entity::ShapeSource;

const WAIT: Duration = Duration::from_secs(10);

fn settings() -> Settings {
    Settings {
        cpu_threads_cap: 2,
        ..Settings::default()
    }
}

fn red_square_doc() -> (Document, EntityKey) {
    let mut scene = Scene::new(20, 20);
    scene.set_background(Rgba::WHITE);
    let mut e = BoxEntity::path("sq", ShapeSource::rect(Vec2::new(10.0, 10.0)));
    e.transform.position.set_base_value(Vec2::new(5.0, 5.0));
    e.paint.fill = Some(ColorAnimator::new("fill", Rgba::new(1.0, 0.0, 0.0, 1.0)));
    let key = scene.add(e);
    (Document::new(scene, settings(), None).unwrap(), key)
}

fn center(doc: &mut Document, frame: i64) -> [u8; 4] {
    doc.render_frame_blocking(frame, WAIT)
        .unwrap()
        .pixel(10, 10)
        .unwrap()
}

fn set_fill(doc: &mut Document, key: EntityKey, rgb: [f64; 3]) {
    doc.edit(key, PropertyKey::Fill, |g| {
        for (c, v) in g.channels_mut().into_iter().zip(rgb) {
            c.set_base_value(v);
        }
    })
    .unwrap();
}

#[test]
fn renders_and_caches_frames() {
    let (mut doc, key) = red_square_doc();
    assert_eq!(center(&mut doc, 0), [255, 0, 0, 255]);
    assert!(doc.frame(0).is_some());
    // Static scene: every frame shares the rendered image.
    assert_eq!(doc.request_frame(40).unwrap(), FrameStatus::Cached);

    let data = doc.latest_render_data(key).unwrap();
    assert_eq!(data.entity, key);
    assert_eq!(data.rel_frame, 0);
}

#[test]
fn edits_invalidate_and_undo_restores() {
    let (mut doc, key) = red_square_doc();
    assert_eq!(center(&mut doc, 0), [255, 0, 0, 255]);

    set_fill(&mut doc, key, [0.0, 0.0, 0.0]);
    assert!(doc.history().can_undo());
    assert_eq!(center(&mut doc, 0), [0, 0, 0, 255]);

    assert!(doc.undo().unwrap());
    assert_eq!(center(&mut doc, 0), [255, 0, 0, 255]);
    assert!(doc.redo().unwrap());
    assert_eq!(center(&mut doc, 0), [0, 0, 0, 255]);
    assert!(!doc.redo().unwrap());
}

#[test]
fn stale_render_is_dropped() {
    let (mut doc, key) = red_square_doc();
    assert_eq!(doc.request_frame(0).unwrap(), FrameStatus::Pending);
    set_fill(&mut doc, key, [0.0, 1.0, 0.0]);
    doc.pump();
    assert!(!doc.is_pending(0));
    assert_eq!(center(&mut doc, 0), [0, 255, 0, 255]);
}

#[test]
fn edit_beyond_pending_frame_narrows_its_cached_range() {
    let (mut doc, key) = red_square_doc();
    doc.edit(key, PropertyKey::Fill, |g| {
        for (c, v) in g.channels_mut().into_iter().zip([1.0, 0.0, 0.0, 1.0]) {
            for f in [0, 10, 20, 30] {
                c.set_key(Keyframe::new(f, v));
            }
        }
    })
    .unwrap();
    assert_eq!(doc.request_frame(0).unwrap(), FrameStatus::Pending);

    // Only frames from 20 on depend on the new key, so frame 0 keeps rendering.
    doc.edit(key, PropertyKey::Fill, |g| {
        for (c, v) in g.channels_mut().into_iter().zip([0.0, 0.0, 1.0, 1.0]) {
            c.set_key(Keyframe::new(50, v));
        }
    })
    .unwrap();
    assert_eq!(center(&mut doc, 0), [255, 0, 0, 255]);
    assert_eq!(doc.request_frame(10).unwrap(), FrameStatus::Cached);
    assert_eq!(doc.request_frame(55).unwrap(), FrameStatus::Pending);
    assert_eq!(center(&mut doc, 55), [0, 0, 255, 255]);
}

#[test]
fn undo_of_removed_entity_keeps_history() {
    let (mut doc, key) = red_square_doc();
    set_fill(&mut doc, key, [0.0, 0.0, 1.0]);
    assert!(doc.scene_mut().remove(key).is_some());

    assert!(doc.undo().is_err());
    assert!(doc.history().can_undo());
    assert!(!doc.history().can_redo());
}

#[test]
fn animated_frames_render_separately() {
    let (mut doc, key) = red_square_doc();
    doc.edit(key, PropertyKey::Opacity, |g| {
        if let Some(ch) = g.channels_mut().into_iter().next() {
            ch.set_key(Keyframe::new(0, 0.0));
            ch.set_key(Keyframe::new(10, 1.0));
        }
    })
    .unwrap();
    assert_eq!(center(&mut doc, 10), [255, 0, 0, 255]);
    assert_eq!(doc.request_frame(0).unwrap(), FrameStatus::Pending);
    assert_eq!(center(&mut doc, 0), [255, 255, 255, 255]);
}

#[test]
fn apply_transform_is_one_undo_step() {
    let (mut doc, key) = red_square_doc();
    doc.apply_transform(key, Affine::translate((2.0, 0.0))).unwrap();
    let pos = |doc: &Document| doc.scene().get(key).unwrap().transform.position.effective_value(0.0);
    assert_eq!(pos(&doc), Vec2::new(7.0, 5.0));
    assert!(doc.undo().unwrap());
    assert_eq!(pos(&doc), Vec2::new(5.0, 5.0));
}

#[test]
fn export_pushes_frames_in_order_and_unpins() {
    let (mut doc, _) = red_square_doc();
    let mut sink = InMemorySink::new();
    let written = doc
        .export_range(FrameRange::new(0, 3), &mut sink, WAIT)
        .unwrap();
    assert_eq!(written, 4);
    assert!(sink.ended);
    assert_eq!(sink.frames.iter().map(|(f, _)| *f).collect::<Vec<_>>(), [0, 1, 2, 3]);
    assert_eq!(sink.info.unwrap().width, 20);
    assert_eq!(doc.cache().stats().blocked, 0);
}

#[test]
fn missing_image_fails_resource_wait() {
    let mut scene = Scene::new(8, 8);
    scene.add(BoxEntity::image("img", "/nonexistent/frameloom.png"));
    let mut doc = Document::new(scene, settings(), None).unwrap();
    let err = doc.wait_for_resources(WAIT).unwrap_err();
    assert!(matches!(err, FrameloomError::Resource(_)), "{err}");
}

#[test]
fn memory_check_keeps_cache_when_normal() {
    let (mut doc, _) = red_square_doc();
    doc.render_frame_blocking(0, WAIT).unwrap();
    let report = doc.check_memory();
    if report.state == crate::cache::memory::MemoryState::Normal {
        assert_eq!(doc.cache().len(), 1);
    }
}
