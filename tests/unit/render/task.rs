use std::time::Duration;

use super::*;
use crate::animation::composite::ColorAnimator;
use crate::effects::animated::{EffectAnimator, EffectSlot};
use crate::foundation::core::{Rgba, Vec2};
use crate::gpu::software::SoftwareGpu;
use crate::render::setup::plan_frame;
use crate::scene::entity::{BoxEntity, ShapeSource};
use crate::scene::model::Scene;
use crate::task::hardware::AccPreference;

const WAIT: Duration = Duration::from_secs(10);

fn square(pos: Vec2, color: Rgba) -> BoxEntity {
    let mut e = BoxEntity::path("sq", ShapeSource::rect(Vec2::new(10.0, 10.0)));
    e.transform.position.set_base_value(pos);
    e.paint.fill = Some(ColorAnimator::new("fill", color));
    e
}

fn run(scene: &Scene, scheduler: &mut Scheduler) -> RenderEvent {
    let (tx, rx) = crossbeam_channel::unbounded();
    let plan = plan_frame(scene, 0, scheduler.resolver()).unwrap();
    schedule_plan(scheduler, plan, 7, &tx);
    assert!(scheduler.wait_idle(WAIT));
    rx.try_recv().unwrap()
}

#[test]
fn root_publishes_finished_frame() {
    let mut scene = Scene::new(20, 20);
    scene.set_background(Rgba::WHITE);
    let mut e = square(Vec2::new(5.0, 5.0), Rgba::new(0.0, 0.0, 1.0, 1.0));
    e.effects.push(EffectSlot::new(EffectAnimator::blur(1.0)));
    scene.add(e);

    let mut scheduler = Scheduler::new(2, AccPreference::Default, None).unwrap();
    match run(&scene, &mut scheduler) {
        RenderEvent::Finished { frame, serial, data } => {
            assert_eq!((frame, serial), (0, 7));
            let image = data.image.as_ref().unwrap();
            assert_eq!((image.width, image.height), (20, 20));
            assert_eq!(image.pixel(10, 10), Some([0, 0, 255, 255]));
            assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(scheduler.stats().finished, 2);
}

#[test]
fn gpu_effects_run_on_gpu_thread() {
    let mut scene = Scene::new(20, 20);
    let mut e = square(Vec2::new(5.0, 5.0), Rgba::new(0.0, 0.0, 1.0, 1.0));
    e.effects
        .push(EffectSlot::new(EffectAnimator::tint(Rgba::new(1.0, 0.0, 0.0, 1.0), 1.0)));
    scene.add(e);

    let mut scheduler =
        Scheduler::new(1, AccPreference::Default, Some(Box::new(SoftwareGpu::new()))).unwrap();
    let RenderEvent::Finished { data, .. } = run(&scene, &mut scheduler) else {
        panic!("frame did not finish");
    };
    assert_eq!(data.image.as_ref().unwrap().pixel(10, 10), Some([255, 0, 0, 255]));
}

#[test]
fn gpu_only_effect_without_gpu_cancels_frame() {
    let mut scene = Scene::new(20, 20);
    let mut e = square(Vec2::new(5.0, 5.0), Rgba::BLACK);
    e.effects
        .push(EffectSlot::new(EffectAnimator::tint(Rgba::WHITE, 0.5)));
    scene.add(e);

    let mut scheduler = Scheduler::new(1, AccPreference::Default, None).unwrap();
    match run(&scene, &mut scheduler) {
        RenderEvent::Canceled { serial, reason, .. } => {
            assert_eq!(serial, 7);
            assert_eq!(reason, CancelReason::DependencyCanceled);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn canceling_root_reports_requested() {
    let scene = Scene::new(8, 8);
    let mut scheduler = Scheduler::new(1, AccPreference::Default, None).unwrap();
    let (tx, rx) = crossbeam_channel::unbounded();
    let plan = plan_frame(&scene, 3, scheduler.resolver()).unwrap();
    let ids = schedule_plan(&mut scheduler, plan, 1, &tx);
    scheduler.cancel(*ids.last().unwrap());
    assert!(scheduler.wait_idle(WAIT));
    let event = rx.try_recv().unwrap();
    assert_eq!((event.frame(), event.serial()), (3, 1));
    assert!(matches!(
        event,
        RenderEvent::Canceled {
            reason: CancelReason::Requested,
            ..
        }
    ));
}
