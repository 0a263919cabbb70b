use serde::{Deserialize, Serialize};

/// What a unit of work can run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareSupport {
    /// CPU only; never enters the GPU context.
    CpuOnly,
    /// Either, CPU unless the preference is GPU-strong.
    CpuPreferred,
    /// GPU only; fails when no GPU context exists.
    GpuOnly,
    /// Either, GPU when one is available and the preference allows it.
    GpuPreferred,
}

impl HardwareSupport {
    pub fn cpu_only(self) -> bool {
        self == Self::CpuOnly
    }

    pub fn gpu_only(self) -> bool {
        self == Self::GpuOnly
    }
}

/// Execution context a task is placed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hardware {
    /// CPU worker pool.
    Cpu,
    /// Disk I/O worker.
    Hdd,
    /// Thread owning the GPU context.
    Gpu,
}

/// User preference for placing work that can run on either CPU or GPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccPreference {
    /// Everything that can run on the CPU does.
    CpuStrong,
    /// Like `Default`, but GPU-preferred work moves to CPU when the GPU queue is busier.
    CpuSoft,
    /// Follow each unit's own preference.
    #[default]
    Default,
    /// Like `Default`, but CPU-preferred work moves to GPU when the CPU queue is busier.
    GpuSoft,
    /// Everything that can run on the GPU does.
    GpuStrong,
}

/// Pending work per queue, used by the soft preferences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueLoad {
    /// Queued plus running CPU tasks.
    pub cpu: usize,
    /// Queued plus running GPU tasks.
    pub gpu: usize,
}

/// Maps a [`HardwareSupport`] tag to a concrete [`Hardware`] placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareResolver {
    /// Acceleration preference.
    pub preference: AccPreference,
    /// Whether a GPU context exists.
    pub gpu_available: bool,
}

impl HardwareResolver {
    pub fn new(preference: AccPreference, gpu_available: bool) -> Self {
        Self {
            preference,
            gpu_available,
        }
    }

    /// CPU-only placement for everything.
    pub fn cpu_only() -> Self {
        Self::new(AccPreference::CpuStrong, false)
    }

    /// Placement ignoring queue load; `None` means the work cannot run here at all.
    pub fn resolve(&self, support: HardwareSupport) -> Option<Hardware> {
        self.resolve_with_load(support, QueueLoad::default())
    }

    pub fn resolve_with_load(&self, support: HardwareSupport, load: QueueLoad) -> Option<Hardware> {
        use AccPreference as P;
        match support {
            HardwareSupport::CpuOnly => Some(Hardware::Cpu),
            HardwareSupport::GpuOnly => self.gpu_available.then_some(Hardware::Gpu),
            HardwareSupport::CpuPreferred => {
                let to_gpu = self.gpu_available
                    && match self.preference {
                        P::GpuStrong => true,
                        P::GpuSoft => load.cpu > load.gpu,
                        P::CpuStrong | P::CpuSoft | P::Default => false,
                    };
                Some(if to_gpu { Hardware::Gpu } else { Hardware::Cpu })
            }
            HardwareSupport::GpuPreferred => {
                let to_gpu = self.gpu_available
                    && match self.preference {
                        P::CpuStrong => false,
                        P::CpuSoft => load.gpu <= load.cpu,
                        P::Default | P::GpuSoft | P::GpuStrong => true,
                    };
                Some(if to_gpu { Hardware::Gpu } else { Hardware::Cpu })
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/hardware.rs"]
mod tests;
