use crate::outcome::OutcomeSource;

use super::job::{Job, JobStatus};

/// Bounds for the random parts of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPolicy {
    pub min_step: u8,
    pub max_step: u8,
    pub failure_probability: f64,
}

impl Default for TickPolicy {
    fn default() -> Self {
        Self {
            min_step: 10,
            max_step: 30,
            failure_probability: 0.2,
        }
    }
}

/// The result of feeding an event to a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The job changed and is still live.
    Advanced(Job),
    /// The job changed and landed in a terminal status.
    Finished(Job),
    /// The event does not apply to the job's current status.
    Ignored,
}

impl Transition {
    /// The updated record, if anything changed.
    #[cfg(test)]
    pub fn job(&self) -> Option<&Job> {
        match self {
            Transition::Advanced(job) | Transition::Finished(job) => Some(job),
            Transition::Ignored => None,
        }
    }
}

/// Pure job lifecycle transitions.
///
/// Each function takes the current record by reference and returns the
/// next one inside a [`Transition`]; nothing is mutated in place.
pub struct JobMachine;

impl JobMachine {
    /// Entering simulation: a pending job is promoted to `Processing` at
    /// once. Other statuses are left for the ticks.
    pub fn begin(job: &Job) -> Transition {
        match job.status {
            JobStatus::Pending => Transition::Advanced(Job {
                status: JobStatus::Processing,
                ..job.clone()
            }),
            _ => Transition::Ignored,
        }
    }

    /// One simulation tick.
    ///
    /// - `Pending` is promoted to `Processing` with its progress untouched.
    /// - `Processing` gains a step in `min_step..=max_step`, clamped to 100.
    ///   Reaching 100 draws the verdict and finishes as `Completed` or `Failed`.
    /// - Terminal statuses ignore the tick.
    pub fn tick(job: &Job, policy: &TickPolicy, outcomes: &mut dyn OutcomeSource) -> Transition {
        match job.status {
            JobStatus::Pending => Transition::Advanced(Job {
                status: JobStatus::Processing,
                ..job.clone()
            }),
            JobStatus::Processing => {
                let step = outcomes.step(policy.min_step, policy.max_step);
                let progress = job.progress.saturating_add(step).min(100);

                if progress < 100 {
                    return Transition::Advanced(Job {
                        progress,
                        ..job.clone()
                    });
                }

                let status = if outcomes.fails(policy.failure_probability) {
                    JobStatus::Failed
                } else {
                    JobStatus::Completed
                };
                Transition::Finished(Job {
                    progress: 100,
                    status,
                    ..job.clone()
                })
            }
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => Transition::Ignored,
        }
    }

    /// `Failed` goes back to `Pending` with no progress. Anything else is ignored.
    pub fn retry(job: &Job) -> Transition {
        match job.status {
            JobStatus::Failed => Transition::Advanced(Job {
                status: JobStatus::Pending,
                progress: 0,
                ..job.clone()
            }),
            _ => Transition::Ignored,
        }
    }

    /// `Pending` and `Processing` become `Cancelled`, keeping their progress.
    pub fn cancel(job: &Job) -> Transition {
        match job.status {
            JobStatus::Pending | JobStatus::Processing => Transition::Finished(Job {
                status: JobStatus::Cancelled,
                ..job.clone()
            }),
            _ => Transition::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ScriptedOutcomes;
    use crate::state_machine::job::seed_jobs;

    fn make_job(status: JobStatus, progress: u8) -> Job {
        Job {
            status,
            progress,
            ..Job::new("Test job".to_string())
        }
    }

    #[test]
    fn pending_tick_promotes_without_progress() {
        let job = make_job(JobStatus::Pending, 0);
        let mut outcomes = ScriptedOutcomes::new([25], []);

        let t = JobMachine::tick(&job, &TickPolicy::default(), &mut outcomes);
        let next = t.job().unwrap();
        assert_eq!(next.status, JobStatus::Processing);
        assert_eq!(next.progress, 0);
        assert_eq!(next.id, job.id);
        // The input record is left alone.
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn begin_promotes_only_pending() {
        let job = make_job(JobStatus::Pending, 0);
        let promoted = JobMachine::begin(&job).job().cloned().unwrap();
        assert_eq!(promoted.status, JobStatus::Processing);
        assert_eq!(promoted.progress, 0);

        for status in [
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobMachine::begin(&make_job(status, 40)), Transition::Ignored);
        }
    }

    #[test]
    fn processing_tick_adds_step() {
        let job = make_job(JobStatus::Processing, 35);
        let mut outcomes = ScriptedOutcomes::new([20], []);

        let t = JobMachine::tick(&job, &TickPolicy::default(), &mut outcomes);
        assert_eq!(
            t,
            Transition::Advanced(Job {
                progress: 55,
                ..job.clone()
            })
        );
    }

    #[test]
    fn reaching_hundred_completes() {
        let job = make_job(JobStatus::Processing, 85);
        let mut outcomes = ScriptedOutcomes::new([30], [false]);

        let t = JobMachine::tick(&job, &TickPolicy::default(), &mut outcomes);
        match t {
            Transition::Finished(next) => {
                assert_eq!(next.status, JobStatus::Completed);
                assert_eq!(next.progress, 100);
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn reaching_hundred_can_fail() {
        let job = make_job(JobStatus::Processing, 90);
        let mut outcomes = ScriptedOutcomes::new([10], [true]);

        let t = JobMachine::tick(&job, &TickPolicy::default(), &mut outcomes);
        let next = t.job().unwrap();
        assert_eq!(next.status, JobStatus::Failed);
        assert_eq!(next.progress, 100);
    }

    #[test]
    fn verdict_is_only_drawn_at_hundred() {
        let job = make_job(JobStatus::Processing, 10);
        // A `true` verdict queued up front must survive an ordinary tick.
        let mut outcomes = ScriptedOutcomes::new([10, 30, 30, 30], [true]);
        let policy = TickPolicy::default();

        let mut current = job;
        let mut last = Transition::Ignored;
        for _ in 0..4 {
            last = JobMachine::tick(&current, &policy, &mut outcomes);
            if let Some(next) = last.job() {
                current = next.clone();
            }
        }
        assert!(matches!(last, Transition::Finished(_)));
        assert_eq!(current.status, JobStatus::Failed);
    }

    #[test]
    fn terminal_statuses_ignore_ticks() {
        let mut outcomes = ScriptedOutcomes::default();
        for status in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            let job = make_job(status, 100);
            assert_eq!(
                JobMachine::tick(&job, &TickPolicy::default(), &mut outcomes),
                Transition::Ignored
            );
        }
    }

    #[test]
    fn retry_only_from_failed() {
        let failed = make_job(JobStatus::Failed, 100);
        let t = JobMachine::retry(&failed);
        let next = t.job().unwrap();
        assert_eq!(next.status, JobStatus::Pending);
        assert_eq!(next.progress, 0);

        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobMachine::retry(&make_job(status, 50)), Transition::Ignored);
        }
    }

    #[test]
    fn cancel_from_live_statuses() {
        let processing = make_job(JobStatus::Processing, 60);
        match JobMachine::cancel(&processing) {
            Transition::Finished(next) => {
                assert_eq!(next.status, JobStatus::Cancelled);
                assert_eq!(next.progress, 60);
            }
            other => panic!("expected Finished, got {other:?}"),
        }

        let pending = make_job(JobStatus::Pending, 0);
        assert!(matches!(JobMachine::cancel(&pending), Transition::Finished(_)));
    }

    #[test]
    fn cancel_is_idempotent() {
        let job = make_job(JobStatus::Processing, 40);
        let once = JobMachine::cancel(&job).job().cloned().unwrap();
        assert_eq!(JobMachine::cancel(&once), Transition::Ignored);
    }

    #[test]
    fn cancel_ignores_finished_jobs() {
        for status in [JobStatus::Completed, JobStatus::Failed] {
            assert_eq!(JobMachine::cancel(&make_job(status, 100)), Transition::Ignored);
        }
    }

    #[test]
    fn progress_never_decreases_while_processing() {
        let mut outcomes = crate::outcome::RandomOutcomes::seeded(42);
        let policy = TickPolicy::default();

        for seed_job in seed_jobs() {
            let mut current = seed_job;
            for _ in 0..20 {
                let before = current.clone();
                match JobMachine::tick(&current, &policy, &mut outcomes) {
                    Transition::Advanced(next) | Transition::Finished(next) => {
                        if before.status == JobStatus::Processing {
                            assert!(next.progress >= before.progress);
                        }
                        if next.status.is_terminal() {
                            assert_eq!(next.progress, 100);
                        }
                        current = next;
                    }
                    Transition::Ignored => break,
                }
            }
        }
    }
}
