#![forbid(unsafe_code)]

pub mod animation;
pub mod cache;
pub mod document;
pub mod effects;
pub mod encode;
pub mod foundation;
pub mod gpu;
pub mod render;
pub mod scene;
pub mod settings;
pub mod task;

pub use animation::composite::{ChannelGroup, ColorAnimator, Vec2Animator, Vec3Animator};
pub use animation::ease::Ease;
pub use animation::history::{History, HistoryEntry};
pub use animation::key::{Interpolation, Keyframe};
pub use animation::scalar::ScalarAnimator;
pub use animation::transform::TransformAnimator;
pub use cache::frame_cache::{CacheStats, FrameCache};
pub use cache::memory::{MemoryChecker, MemoryReport, MemoryState};
pub use document::document::{Document, FrameReady, FrameStatus};
pub use effects::animated::{EffectAnimator, EffectSlot};
pub use effects::blend::BlendMode;
pub use effects::effect::RasterEffect;
pub use effects::renderer::EffectsRenderer;
pub use encode::sink::{FrameSink, InMemorySink, PngSequenceSink, SinkInfo};
pub use foundation::core::{Affine, BezPath, EntityKey, FrameRange, PixelRect, Point, Rect, Rgba, Vec2};
pub use foundation::error::{FrameloomError, FrameloomResult};
pub use foundation::math::Fingerprint;
pub use gpu::context::GpuContext;
pub use gpu::software::SoftwareGpu;
pub use render::data::RenderData;
pub use render::image::RasterImage;
pub use scene::desc::SceneDesc;
pub use scene::entity::{BoxEntity, BoxKind, Paint, PropertyKey, ShapeSource};
pub use scene::model::Scene;
pub use settings::Settings;
pub use task::cancel::CancelToken;
pub use task::custom::CustomTask;
pub use task::hardware::{AccPreference, Hardware, HardwareSupport};
pub use task::scheduler::{DependentPolicy, Scheduler, SchedulerStats, TaskId};
pub use task::task::{Affinity, CancelReason, Progress, Task, TaskOutcome};
