use crossbeam_channel::{Receiver, Sender};

use crate::foundation::core::{EntityKey, FrameRange};

/// "Value changed, affecting frames `range`" for one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueChanged {
    /// Entity whose animator changed.
    pub entity: EntityKey,
    /// Frames whose effective value may differ after the change.
    pub range: FrameRange,
}

/// Sending half attached to every animator of an entity.
///
/// Notifications are fire-and-forget: a dropped receiver silently discards them.
#[derive(Clone, Debug)]
pub struct ChangeNotifier {
    entity: EntityKey,
    tx: Sender<ValueChanged>,
}

impl ChangeNotifier {
    pub fn new(entity: EntityKey, tx: Sender<ValueChanged>) -> Self {
        Self { entity, tx }
    }

    pub fn entity(&self) -> EntityKey {
        self.entity
    }

    pub fn notify(&self, range: FrameRange) {
        if range.is_empty() {
            return;
        }
        tracing::trace!(entity = ?self.entity, min = range.min, max = range.max, "value changed");
        let _ = self.tx.send(ValueChanged {
            entity: self.entity,
            range,
        });
    }
}

/// Unbounded channel for change notifications.
pub fn change_channel() -> (Sender<ValueChanged>, Receiver<ValueChanged>) {
    crossbeam_channel::unbounded()
}
