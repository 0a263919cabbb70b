/// Result alias used throughout the crate.
pub type FrameloomResult<T> = Result<T, FrameloomError>;

/// Crate error type.
///
/// Task bodies return these from `process`; the scheduler turns them into a canceled outcome
/// instead of letting them cross thread boundaries.
#[derive(thiserror::Error, Debug)]
pub enum FrameloomError {
    /// Invalid input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Keyframe or animator misuse.
    #[error("animation error: {0}")]
    Animation(String),

    /// Failure while evaluating a scene into render data.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Failure while rasterizing or applying an effect.
    #[error("render error: {0}")]
    Render(String),

    /// Disk read failure, missing or lost GPU context.
    #[error("resource error: {0}")]
    Resource(String),

    /// Work stopped at a cancellation checkpoint.
    #[error("canceled")]
    Canceled,

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrameloomError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for [`FrameloomError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl From<serde_json::Error> for FrameloomError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
