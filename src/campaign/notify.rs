use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use super::board::{PendingMutation, SharedBoard, lock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// Restores the statuses a mutation overwrote.
#[derive(Debug, Clone)]
pub struct UndoAction {
    board: SharedBoard,
    mutation: PendingMutation,
}

impl UndoAction {
    pub(crate) fn new(board: SharedBoard, mutation: PendingMutation) -> Self {
        Self { board, mutation }
    }

    /// Reverts the local campaign list. Returns how many campaigns were
    /// restored.
    pub fn invoke(self) -> usize {
        let mut board = lock(&self.board);
        self.mutation.revert(&mut board.campaigns);
        info!(count = self.mutation.len(), "mutation undone");
        self.mutation.len()
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub undo: Option<UndoAction>,
    pub duration: Duration,
}

/// Receives notifications emitted by the coordinator.
pub trait NotificationSink {
    fn notify(&self, notification: Notification);
}

/// Shows one notification at a time. A newer one replaces the current one,
/// and a notification disappears on its own once its duration elapses.
#[derive(Debug, Default)]
pub struct ToastSlot {
    current: Mutex<Option<(Notification, Instant)>>,
}

impl ToastSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<(Notification, Instant)>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The visible notification, if it has not expired.
    pub fn current(&self) -> Option<Notification> {
        let mut slot = self.slot();
        let expired = matches!(&*slot, Some((n, shown_at)) if shown_at.elapsed() >= n.duration);
        if expired {
            *slot = None;
        }
        slot.as_ref().map(|(n, _)| n.clone())
    }

    /// Hides the visible notification and returns it.
    pub fn dismiss(&self) -> Option<Notification> {
        let visible = self.current();
        *self.slot() = None;
        visible
    }

    /// Takes the undo action of the visible notification, dismissing it.
    pub fn take_undo(&self) -> Option<UndoAction> {
        self.dismiss().and_then(|n| n.undo)
    }
}

impl NotificationSink for ToastSlot {
    fn notify(&self, notification: Notification) {
        *self.slot() = Some((notification, Instant::now()));
    }
}
