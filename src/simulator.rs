//! Timer-driven job lifecycle simulation.
//!
//! [`JobSimulator`] keeps a registry of per-job timers. Every simulated job
//! owns exactly one tokio task that ticks at a fixed interval and feeds the
//! job through [`JobMachine::tick`]. The registry entry holds the live
//! snapshot of the job, so retry/cancel always act on the latest state.
//!
//! Timer tasks and public operations are serialized on a single mutex: a
//! tick either runs completely before a `cancel`/`stop` or observes that its
//! entry is gone and exits without publishing anything.
//!
//! Update callbacks run while that mutex is held, so they must not call back
//! into the simulator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::OpsdeskConfig;
use crate::outcome::OutcomeSource;
use crate::state_machine::{Job, JobMachine, TickPolicy, Transition};

/// Callback receiving a fresh job snapshot after every state change.
pub type UpdateFn = Arc<dyn Fn(Job) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorSettings {
    pub tick_interval: Duration,
    pub policy: TickPolicy,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1200),
            policy: TickPolicy::default(),
        }
    }
}

impl SimulatorSettings {
    pub fn from_config(config: &OpsdeskConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            policy: TickPolicy {
                min_step: config.min_step,
                max_step: config.max_step,
                failure_probability: config.failure_probability,
            },
        }
    }
}

/// A live timer. Dropping the entry aborts its task, so removing it from the
/// registry releases the timer on every path.
struct TimerEntry {
    job: Job,
    generation: u64,
    handle: AbortHandle,
}

impl Drop for TimerEntry {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Registry {
    timers: HashMap<String, TimerEntry>,
    outcomes: Box<dyn OutcomeSource + Send>,
    next_generation: u64,
}

struct Shared {
    settings: SimulatorSettings,
    registry: Mutex<Registry>,
    idle: Notify,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one tick for `job_id`. Returns `false` once the timer should stop.
    fn tick(&self, job_id: &str, generation: u64, on_update: &UpdateFn) -> bool {
        let mut registry = self.registry();
        let Registry {
            timers, outcomes, ..
        } = &mut *registry;

        let Some(entry) = timers.get_mut(job_id) else {
            return false;
        };
        if entry.generation != generation {
            // A newer timer owns this job; this one was superseded.
            return false;
        }

        match JobMachine::tick(&entry.job, &self.settings.policy, outcomes.as_mut()) {
            Transition::Advanced(job) => {
                debug!(job_id, status = %job.status, progress = job.progress, "tick");
                entry.job = job.clone();
                on_update(job);
                true
            }
            Transition::Finished(job) => {
                info!(job_id, status = %job.status, "job finished");
                timers.remove(job_id);
                let idle = timers.is_empty();
                on_update(job);
                if idle {
                    self.idle.notify_waiters();
                }
                false
            }
            Transition::Ignored => {
                timers.remove(job_id);
                if timers.is_empty() {
                    self.idle.notify_waiters();
                }
                false
            }
        }
    }
}

/// Per-job timer registry driving the job lifecycle.
///
/// Cheap to clone; clones share the same registry. Must be used from inside
/// a tokio runtime since starting a job spawns its timer task.
#[derive(Clone)]
pub struct JobSimulator {
    shared: Arc<Shared>,
}

impl JobSimulator {
    pub fn new(settings: SimulatorSettings, outcomes: impl OutcomeSource + Send + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                registry: Mutex::new(Registry {
                    timers: HashMap::new(),
                    outcomes: Box::new(outcomes),
                    next_generation: 0,
                }),
                idle: Notify::new(),
            }),
        }
    }

    /// Starts ticking `job`. A job that is not pending/processing, or that
    /// already has a timer, is left alone.
    #[cfg(test)]
    pub fn start<F>(&self, job: Job, on_update: F)
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        self.start_shared(job, Arc::new(on_update));
    }

    /// A pending job is promoted to processing right away and `on_update`
    /// sees that snapshot before the first tick.
    pub fn start_shared(&self, job: Job, on_update: UpdateFn) {
        if !job.status.is_simulatable() {
            debug!(job_id = %job.id, status = %job.status, "not simulatable, skipping");
            return;
        }

        let mut registry = self.shared.registry();
        if registry.timers.contains_key(&job.id) {
            debug!(job_id = %job.id, "already simulating");
            return;
        }

        match JobMachine::begin(&job) {
            Transition::Advanced(promoted) | Transition::Finished(promoted) => {
                self.spawn_timer(&mut registry, promoted.clone(), Arc::clone(&on_update));
                on_update(promoted);
            }
            Transition::Ignored => self.spawn_timer(&mut registry, job, on_update),
        }
    }

    fn spawn_timer(&self, registry: &mut Registry, job: Job, on_update: UpdateFn) {
        registry.next_generation += 1;
        let generation = registry.next_generation;
        let handle = tokio::spawn(run_timer(
            Arc::clone(&self.shared),
            job.id.clone(),
            generation,
            on_update,
        ))
        .abort_handle();

        debug!(job_id = %job.id, status = %job.status, generation, "timer started");
        registry.timers.insert(
            job.id.clone(),
            TimerEntry {
                job,
                generation,
                handle,
            },
        );
    }

    /// Halts the timer for `job_id`, if any. The job keeps whatever state
    /// it reached.
    pub fn stop(&self, job_id: &str) {
        let mut registry = self.shared.registry();
        if registry.timers.remove(job_id).is_some() {
            debug!(job_id, "timer stopped");
            if registry.timers.is_empty() {
                self.shared.idle.notify_waiters();
            }
        }
    }

    /// Moves a failed job back to pending and starts simulating it again.
    ///
    /// Returns the pending snapshot, or `None` when the job was not failed.
    #[cfg(test)]
    pub fn retry<F>(&self, job: &Job, on_update: F) -> Option<Job>
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        self.retry_shared(job, Arc::new(on_update))
    }

    /// The retried job stays pending until its first tick.
    pub fn retry_shared(&self, job: &Job, on_update: UpdateFn) -> Option<Job> {
        let mut registry = self.shared.registry();
        if registry.timers.contains_key(&job.id) {
            // A job with a live timer cannot be in `Failed`.
            return None;
        }

        let pending = match JobMachine::retry(job) {
            Transition::Advanced(pending) | Transition::Finished(pending) => pending,
            Transition::Ignored => {
                debug!(job_id = %job.id, status = %job.status, "retry ignored");
                return None;
            }
        };

        info!(job_id = %job.id, "job retried");
        self.spawn_timer(&mut registry, pending.clone(), Arc::clone(&on_update));
        on_update(pending.clone());
        Some(pending)
    }

    /// Cancels a pending or processing job and stops its timer.
    ///
    /// Uses the simulator's live snapshot when the job is being simulated.
    /// Returns the cancelled snapshot, or `None` when nothing changed.
    pub fn cancel<F>(&self, job: &Job, on_update: F) -> Option<Job>
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        let mut registry = self.shared.registry();
        let current = registry
            .timers
            .get(&job.id)
            .map(|entry| entry.job.clone())
            .unwrap_or_else(|| job.clone());

        match JobMachine::cancel(&current) {
            Transition::Advanced(cancelled) | Transition::Finished(cancelled) => {
                registry.timers.remove(&job.id);
                info!(job_id = %job.id, progress = cancelled.progress, "job cancelled");
                on_update(cancelled.clone());
                if registry.timers.is_empty() {
                    self.shared.idle.notify_waiters();
                }
                Some(cancelled)
            }
            Transition::Ignored => {
                debug!(job_id = %job.id, status = %current.status, "cancel ignored");
                None
            }
        }
    }

    pub fn is_simulating(&self, job_id: &str) -> bool {
        self.shared.registry().timers.contains_key(job_id)
    }

    pub fn active_count(&self) -> usize {
        self.shared.registry().timers.len()
    }

    /// Latest snapshot of a job that is being simulated.
    #[cfg(test)]
    pub fn snapshot(&self, job_id: &str) -> Option<Job> {
        self.shared
            .registry()
            .timers
            .get(job_id)
            .map(|entry| entry.job.clone())
    }

    /// Resolves once no timers are left.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stops every timer.
    pub fn shutdown(&self) {
        let ids: Vec<String> = self.shared.registry().timers.keys().cloned().collect();
        for id in &ids {
            self.stop(id);
        }
        if !ids.is_empty() {
            debug!(stopped = ids.len(), "simulator shut down");
        }
        self.shared.idle.notify_waiters();
    }
}

async fn run_timer(shared: Arc<Shared>, job_id: String, generation: u64, on_update: UpdateFn) {
    let period = shared.settings.tick_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !shared.tick(&job_id, generation, &on_update) {
            break;
        }
    }
}
