//! Campaign list: simulated backend, querying and selection, the
//! optimistic mutation coordinator with its notifications, and the
//! single-campaign detail view.

pub mod api;
pub mod board;
pub mod coordinator;
pub mod detail;
pub mod notify;
pub mod query;

pub use api::{CampaignApi, SimulatedCampaignApi};
pub use board::CampaignBoard;
pub use coordinator::{MutationCoordinator, MutationOutcome};
pub use detail::{CampaignEdit, Performance};
pub use notify::{Notification, NotificationKind, ToastSlot, UndoAction};
pub use query::{CampaignPage, CampaignQuery, SortDirection, SortKey};
