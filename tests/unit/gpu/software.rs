use super::*;
use crate::foundation::core::Rgba;
use crate::gpu::context::GpuRenderTools;

fn data_for(img: &RasterImage) -> GpuRenderData {
    GpuRenderData {
        pos: (0, 0),
        size: (img.width, img.height),
        resolution: 1.0,
    }
}

#[test]
fn ping_pong_chains_programs_and_frees_textures() {
    let mut gpu = SoftwareGpu::new();
    let img = RasterImage::filled(2, 2, [10, 20, 30, 255]);
    let data = data_for(&img);

    let mut tools = GpuRenderTools::new(&mut gpu, &img).unwrap();
    let tint = ShaderProgram::Tint {
        color: Rgba::new(1.0, 1.0, 1.0, 1.0),
        amount: 1.0,
    };
    gpu.run_program(&tint, tools.source(), tools.target(), &data).unwrap();
    tools.swap();
    let darken = ShaderProgram::Brightness { amount: -1.0 };
    gpu.run_program(&darken, tools.source(), tools.target(), &data).unwrap();
    tools.swap();
    let out = tools.finish(&mut gpu).unwrap();

    assert_eq!(out.pixel(1, 1), Some([0, 0, 0, 255]));
    assert_eq!(gpu.programs_run(), 2);
    assert_eq!(gpu.texture_count(), 0);
}

#[test]
fn lost_context_rejects_work() {
    let mut gpu = SoftwareGpu::new();
    gpu.lose();
    let img = RasterImage::new(1, 1);
    let err = GpuRenderTools::new(&mut gpu, &img).unwrap_err();
    assert!(err.to_string().contains("lost"));
}

#[test]
fn size_mismatch_is_an_error() {
    let mut gpu = SoftwareGpu::new();
    let a = gpu.upload(&RasterImage::new(2, 2)).unwrap();
    let b = gpu.create_target(3, 3).unwrap();
    let data = GpuRenderData {
        pos: (0, 0),
        size: (2, 2),
        resolution: 1.0,
    };
    let prog = ShaderProgram::Contrast { amount: 0.0 };
    assert!(gpu.run_program(&prog, a, b, &data).is_err());
}
