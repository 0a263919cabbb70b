use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{FrameloomError, FrameloomResult};

/// Shared cooperative cancellation flag.
///
/// The controlling thread sets it; `process` bodies poll it at safe points through
/// [`CancelToken::checkpoint`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Canceled)` once cancellation was requested.
    pub fn checkpoint(&self) -> FrameloomResult<()> {
        if self.is_canceled() {
            Err(FrameloomError::Canceled)
        } else {
            Ok(())
        }
    }
}
