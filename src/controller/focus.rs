// Deferred focus: tracks new leaves until their widgets can take focus.

use std::collections::HashMap;
use std::time::Instant;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::pane::PaneId;
use crate::widget::Readiness;

/// How a leaf is waiting for focus.
#[derive(Debug)]
enum PendingFocus {
    /// Widget was already ready; announce once the delay has passed.
    Delayed { due: Instant },
    /// Widget is initializing; announce when the subscription reports ready.
    Waiting(Receiver<Readiness>),
}

/// At most one pending entry per leaf. Entries leave the tracker exactly once:
/// by firing, by failing, or by being cancelled.
#[derive(Debug, Default)]
pub(crate) struct FocusTracker {
    pending: HashMap<PaneId, PendingFocus>,
}

impl FocusTracker {
    pub(crate) fn schedule(&mut self, id: PaneId, due: Instant) {
        self.pending.insert(id, PendingFocus::Delayed { due });
    }

    pub(crate) fn wait(&mut self, id: PaneId, ready_rx: Receiver<Readiness>) {
        self.pending.insert(id, PendingFocus::Waiting(ready_rx));
    }

    /// Drop any pending entry for `id`. Returns whether one existed.
    pub(crate) fn cancel(&mut self, id: &PaneId) -> bool {
        self.pending.remove(id).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn is_pending(&self, id: &PaneId) -> bool {
        self.pending.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Earliest delayed deadline, for hosts that sleep between turns.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .filter_map(|p| match p {
                PendingFocus::Delayed { due } => Some(*due),
                PendingFocus::Waiting(_) => None,
            })
            .min()
    }

    /// Remove and return leaves whose widgets can now take focus, sorted by id.
    ///
    /// Failed or abandoned subscriptions are dropped without being returned.
    pub(crate) fn take_ready(&mut self, now: Instant) -> Vec<PaneId> {
        let mut ready = Vec::new();
        self.pending.retain(|id, pending| match pending {
            PendingFocus::Delayed { due } => {
                if *due <= now {
                    ready.push(id.clone());
                    false
                } else {
                    true
                }
            }
            PendingFocus::Waiting(rx) => match rx.try_recv() {
                Ok(Readiness::Ready) => {
                    ready.push(id.clone());
                    false
                }
                Ok(state) => {
                    log::warn!("Widget for {id} settled as {state:?}; it will not be focused");
                    false
                }
                Err(TryRecvError::Empty) => true,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("Readiness subscription for {id} was dropped");
                    false
                }
            },
        });
        ready.sort();
        ready
    }
}
