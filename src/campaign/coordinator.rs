//! Optimistic status changes for the campaign list.
//!
//! [`MutationCoordinator`] applies a status change to the shared board
//! before the remote call resolves, then either keeps it or rolls every
//! target back to its captured status. It reports the outcome through a
//! [`NotificationSink`].

use std::time::Duration;

use tracing::{info, warn};

use super::api::CampaignApi;
use super::board::{PendingMutation, SharedBoard, lock};
use super::notify::{Notification, NotificationKind, NotificationSink, UndoAction};
use crate::error::RemoteError;
use crate::state_machine::CampaignStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Nothing in the request needed changing.
    NoOp,
    /// Another mutation is still in flight.
    Busy,
    Applied { count: usize },
    RolledBack { count: usize, error: RemoteError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Selection,
    Single,
}

/// Clears the board's `mutating` flag when dropped, including when the
/// operation future is dropped mid-flight.
struct MutatingGuard<'a> {
    board: &'a SharedBoard,
}

impl Drop for MutatingGuard<'_> {
    fn drop(&mut self) {
        lock(self.board).mutating = false;
    }
}

pub struct MutationCoordinator<A, N> {
    api: A,
    sink: N,
    board: SharedBoard,
    toast_duration: Duration,
    offer_undo: bool,
}

impl<A: CampaignApi, N: NotificationSink> MutationCoordinator<A, N> {
    pub fn new(api: A, sink: N, board: SharedBoard) -> Self {
        Self {
            api,
            sink,
            board,
            toast_duration: Duration::from_millis(4000),
            offer_undo: false,
        }
    }

    pub fn with_toast_duration(mut self, duration: Duration) -> Self {
        self.toast_duration = duration;
        self
    }

    /// Attach an undo action to success notifications.
    pub fn with_undo(mut self, offer_undo: bool) -> Self {
        self.offer_undo = offer_undo;
        self
    }

    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn pause_selected(&self) -> MutationOutcome {
        self.apply_to_selection(CampaignStatus::Paused).await
    }

    pub async fn pause_one(&self, id: &str) -> MutationOutcome {
        self.apply_to_one(id, CampaignStatus::Paused).await
    }

    /// Changes every selected campaign to `desired`; clears the selection on
    /// success.
    pub async fn apply_to_selection(&self, desired: CampaignStatus) -> MutationOutcome {
        let ids: Vec<String> = lock(&self.board).selected.iter().cloned().collect();
        self.run(ids, desired, Scope::Selection).await
    }

    /// Changes one campaign to `desired`. The selection is left alone.
    pub async fn apply_to_one(&self, id: &str, desired: CampaignStatus) -> MutationOutcome {
        self.run(vec![id.to_string()], desired, Scope::Single).await
    }

    async fn run(&self, ids: Vec<String>, desired: CampaignStatus, scope: Scope) -> MutationOutcome {
        let mutation = {
            let mut board = lock(&self.board);
            if board.mutating {
                return MutationOutcome::Busy;
            }
            let mutation = PendingMutation::capture(&board.campaigns, &ids, desired);
            if mutation.is_empty() {
                return MutationOutcome::NoOp;
            }
            board.mutating = true;
            mutation.apply(&mut board.campaigns, desired);
            mutation
        };
        let guard = MutatingGuard { board: &self.board };
        let count = mutation.len();

        info!(count, status = %desired, "applying optimistic status change");
        let result = self.api.update_status(&mutation.affected_ids, desired).await;

        let (outcome, notification) = match result {
            Ok(()) => {
                if scope == Scope::Selection {
                    lock(&self.board).selected.clear();
                }
                let undo = self
                    .offer_undo
                    .then(|| UndoAction::new(self.board.clone(), mutation.clone()));
                info!(count, status = %desired, "status change confirmed");
                (
                    MutationOutcome::Applied { count },
                    Notification {
                        kind: NotificationKind::Success,
                        message: success_message(count, desired),
                        undo,
                        duration: self.toast_duration,
                    },
                )
            }
            Err(error) => {
                mutation.revert(&mut lock(&self.board).campaigns);
                warn!(count, status = %desired, %error, "status change failed, reverted");
                (
                    MutationOutcome::RolledBack { count, error },
                    Notification {
                        kind: NotificationKind::Failure,
                        message: failure_message(desired),
                        undo: None,
                        duration: self.toast_duration,
                    },
                )
            }
        };

        drop(guard);
        self.sink.notify(notification);
        outcome
    }
}

/// "1 campaign paused", "3 campaigns paused".
pub fn success_message(count: usize, status: CampaignStatus) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} campaign{plural} {}", status.past_tense())
}

/// "Pause failed. Changes reverted."
pub fn failure_message(status: CampaignStatus) -> String {
    format!("{} failed. Changes reverted.", status.action_name())
}
