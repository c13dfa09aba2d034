use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a background job.
///
/// `Completed`, `Failed` and `Cancelled` are terminal: the simulator never
/// moves a job out of them on its own. Only an explicit retry leaves `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether a job in this status can be picked up by the simulator.
    pub fn is_simulatable(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.pad("pending"),
            JobStatus::Processing => f.pad("processing"),
            JobStatus::Completed => f.pad("completed"),
            JobStatus::Failed => f.pad("failed"),
            JobStatus::Cancelled => f.pad("cancelled"),
        }
    }
}

/// A unit of background work tracked through a fixed lifecycle.
///
/// Records are treated as values: transitions in [`JobMachine`](super::JobMachine)
/// return a fresh copy instead of touching the one they were given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub progress: u8,
    pub status: JobStatus,
}

impl Job {
    #[cfg(test)]
    pub fn new(name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
            progress: 0,
            status: JobStatus::Pending,
        }
    }

    /// Brings stored progress back in line with the status: pending is 0,
    /// completed and failed are 100, anything else is capped at 100.
    pub fn normalized(self) -> Self {
        let progress = match self.status {
            JobStatus::Pending => 0,
            JobStatus::Completed | JobStatus::Failed => 100,
            JobStatus::Processing | JobStatus::Cancelled => self.progress.min(100),
        };
        Self { progress, ..self }
    }

    /// Progress as it should be shown to a user.
    ///
    /// Pending and cancelled jobs show an empty bar, finished jobs a full one,
    /// whatever the stored value says.
    pub fn display_progress(&self) -> u8 {
        match self.status {
            JobStatus::Pending | JobStatus::Cancelled => 0,
            JobStatus::Processing => self.progress.min(100),
            JobStatus::Completed | JobStatus::Failed => 100,
        }
    }
}

/// The job list a fresh install starts with.
pub fn seed_jobs() -> Vec<Job> {
    let at = |minute: u32| {
        Utc.with_ymd_and_hms(2025, 2, 20, 10, minute, 0)
            .single()
            .unwrap_or_else(Utc::now)
    };
    let job = |id: &str, name: &str, minute: u32, progress: u8, status: JobStatus| Job {
        id: id.to_string(),
        name: name.to_string(),
        created_at: at(minute),
        progress,
        status,
    };

    vec![
        job("1", "Import Campaign Data", 0, 0, JobStatus::Pending),
        job("2", "Generate Report", 5, 35, JobStatus::Processing),
        job("3", "Sync Assets", 10, 100, JobStatus::Completed),
        job("4", "Validate Data", 15, 100, JobStatus::Failed),
    ]
}
