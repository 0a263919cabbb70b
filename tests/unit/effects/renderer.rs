use super::*;
use crate::foundation::core::{Rgba, Vec2};
use crate::gpu::software::SoftwareGpu;
use crate::task::hardware::AccPreference;

fn gpu_resolver() -> HardwareResolver {
    HardwareResolver::new(AccPreference::Default, true)
}

fn data_for(img: &RasterImage) -> GpuRenderData {
    GpuRenderData {
        pos: (0, 0),
        size: (img.width, img.height),
        resolution: 1.0,
    }
}

#[test]
fn gpu_pass_stops_at_first_cpu_effect() {
    let tint = RasterEffect::Tint {
        color: Rgba::WHITE,
        amount: 1.0,
    };
    let blur = RasterEffect::Blur { radius: 1.0 };
    let mut fx = EffectsRenderer::new([tint, blur], gpu_resolver());
    let mut gpu = SoftwareGpu::new();
    let mut img = RasterImage::filled(3, 3, [0, 0, 0, 255]);
    let data = data_for(&img);
    let cancel = CancelToken::new();

    assert_eq!(fx.next_hardware_support(), HardwareSupport::GpuOnly);
    let applied = fx.process_gpu(&mut gpu, &mut img, &data, &cancel).unwrap();
    assert_eq!(applied, 1);
    assert_eq!(fx.len(), 1);
    assert_eq!(img.pixel(1, 1), Some([255, 255, 255, 255]));

    assert_eq!(fx.next_hardware_support(), HardwareSupport::CpuOnly);
    assert_eq!(fx.process_gpu(&mut gpu, &mut img, &data, &cancel).unwrap(), 0);
    fx.process_cpu(&mut img, &cancel).unwrap();
    assert!(fx.is_empty());
    assert_eq!(img.pixel(1, 1), Some([255, 255, 255, 255]));
    assert_eq!(gpu.texture_count(), 0);
}

#[test]
fn consecutive_gpu_effects_run_in_one_pass() {
    let effects = [
        RasterEffect::Brightness { amount: 1.0 },
        RasterEffect::Tint {
            color: Rgba::BLACK,
            amount: 1.0,
        },
    ];
    let mut fx = EffectsRenderer::new(effects, gpu_resolver());
    let mut gpu = SoftwareGpu::new();
    let mut img = RasterImage::filled(2, 2, [10, 10, 10, 255]);
    let data = data_for(&img);
    let n = fx
        .process_gpu(&mut gpu, &mut img, &data, &CancelToken::new())
        .unwrap();
    assert_eq!(n, 2);
    assert_eq!(gpu.programs_run(), 2);
    assert_eq!(img.pixel(0, 0), Some([0, 0, 0, 255]));
}

#[test]
fn gpu_preferred_runs_on_cpu_without_device() {
    let fx = EffectsRenderer::new(
        [RasterEffect::Brightness { amount: 0.5 }],
        HardwareResolver::cpu_only(),
    );
    assert_eq!(fx.next_hardware(QueueLoad::default()), Some(Hardware::Cpu));
}

#[test]
fn global_rect_is_union_across_chain() {
    let effects = [
        RasterEffect::Shadow {
            blur: 0.0,
            offset: Vec2::new(10.0, 0.0),
            color: Rgba::BLACK,
            opacity: 1.0,
        },
        RasterEffect::Blur { radius: 2.0 },
    ];
    let fx = EffectsRenderer::new(effects, gpu_resolver());
    let base = PixelRect::new(0, 0, 10, 10);
    let max = PixelRect::new(-100, -100, 100, 100);
    assert_eq!(fx.set_base_global_rect(base, max), PixelRect::new(-2, -2, 22, 12));

    let clipped = fx.set_base_global_rect(base, PixelRect::new(0, 0, 15, 15));
    assert_eq!(clipped, PixelRect::new(0, 0, 15, 12));
}

#[test]
#[should_panic(expected = "empty effect list")]
fn next_hardware_support_requires_effects() {
    let fx = EffectsRenderer::new(Vec::<RasterEffect>::new(), gpu_resolver());
    let _ = fx.next_hardware_support();
}

#[test]
#[should_panic(expected = "gpu-only")]
fn process_cpu_rejects_gpu_only_effect() {
    let tint = RasterEffect::Tint {
        color: Rgba::WHITE,
        amount: 1.0,
    };
    let mut fx = EffectsRenderer::new([tint], gpu_resolver());
    let mut img = RasterImage::new(1, 1);
    let _ = fx.process_cpu(&mut img, &CancelToken::new());
}
