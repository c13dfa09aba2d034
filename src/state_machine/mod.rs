mod campaign;
mod job;
mod state;

pub use campaign::{Asset, Campaign, CampaignStatus, seed_campaigns};
pub use job::{Job, JobStatus, seed_jobs};
pub use state::{JobMachine, TickPolicy, Transition};
