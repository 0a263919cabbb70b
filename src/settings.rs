use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::task::hardware::AccPreference;

/// Performance settings, stored as JSON.
///
/// Missing fields fall back to their defaults, so older files keep loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// CPU worker threads; `<= 0` uses every logical core.
    pub cpu_threads_cap: i32,
    /// Process RAM cap in MiB; `<= 0` disables it.
    pub ram_mb_cap: i64,
    pub acc_preference: AccPreference,
    /// Frame cache budget in MiB; `0` leaves the cache to memory pressure alone.
    pub cache_budget_mb: u64,
    /// Maximum undo steps kept.
    pub undo_cap: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cpu_threads_cap: 0,
            ram_mb_cap: 0,
            acc_preference: AccPreference::Default,
            cache_budget_mb: 0,
            undo_cap: 25,
        }
    }
}

impl Settings {
    /// Worker count after applying the cap.
    pub fn cpu_threads(&self) -> usize {
        let cores = num_cpus::get().max(1);
        match usize::try_from(self.cpu_threads_cap) {
            Ok(0) | Err(_) => cores,
            Ok(cap) => cap.min(cores),
        }
    }

    pub fn cache_budget_bytes(&self) -> Option<usize> {
        (self.cache_budget_mb > 0).then(|| (self.cache_budget_mb as usize).saturating_mul(1024 * 1024))
    }

    pub fn validate(&self) -> FrameloomResult<()> {
        if self.undo_cap == 0 {
            return Err(FrameloomError::validation("undo_cap must be at least 1"));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> FrameloomResult<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> FrameloomResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> FrameloomResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FrameloomError::resource(format!("read settings '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> FrameloomResult<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| {
            FrameloomError::resource(format!("write settings '{}': {e}", path.display()))
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/settings.rs"]
mod tests;
