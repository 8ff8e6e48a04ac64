//! Sticky encoder cache.
//!
//! One slot per [`AccelerationMode`], each either unresolved or holding the
//! candidate that last produced a real encode. Slots are independent: a
//! selection in progress for one mode never blocks the other.

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::encoders::{AccelerationMode, EncoderCandidate};

/// Observable state of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unresolved,
    Pinned(&'static EncoderCandidate),
}

/// Process-wide memory of the working encoder per acceleration mode.
///
/// Construct one per process (or per test) and share it via `Arc`.
#[derive(Debug, Default)]
pub struct EncoderCache {
    slots: [Mutex<Option<&'static EncoderCandidate>>; 2],
    /// Held while a job walks the candidate list, so two jobs in the same
    /// mode never race to pin different candidates.
    gates: [AsyncMutex<()>; 2],
}

impl EncoderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, mode: AccelerationMode) -> SlotState {
        match self.pinned(mode) {
            Some(candidate) => SlotState::Pinned(candidate),
            None => SlotState::Unresolved,
        }
    }

    pub fn pinned(&self, mode: AccelerationMode) -> Option<&'static EncoderCandidate> {
        *self.slots[mode.index()].lock()
    }

    /// Pin `candidate` for `mode`, returning the previously pinned one.
    pub fn pin(
        &self,
        mode: AccelerationMode,
        candidate: &'static EncoderCandidate,
    ) -> Option<&'static EncoderCandidate> {
        let previous = self.slots[mode.index()].lock().replace(candidate);
        tracing::info!(
            mode = %mode,
            encoder = candidate.name,
            video_codec = candidate.video_codec,
            "Pinned encoder"
        );
        previous
    }

    /// Reset `mode` to unresolved only if `candidate` is still the pinned one.
    ///
    /// Returns `true` when the slot was cleared.
    pub fn unpin_if(&self, mode: AccelerationMode, candidate: &EncoderCandidate) -> bool {
        let mut slot = self.slots[mode.index()].lock();
        match *slot {
            Some(current) if current.name == candidate.name => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self, mode: AccelerationMode) {
        if self.slots[mode.index()].lock().take().is_some() {
            tracing::debug!(mode = %mode, "Cleared pinned encoder");
        }
    }

    pub fn clear_all(&self) {
        for mode in AccelerationMode::ALL {
            self.clear(mode);
        }
    }

    pub(crate) async fn selection_gate(&self, mode: AccelerationMode) -> AsyncMutexGuard<'_, ()> {
        self.gates[mode.index()].lock().await
    }
}
