//! Sources of randomness for the job simulator.
//!
//! The simulator never calls `rand` directly; it asks an [`OutcomeSource`]
//! for the next progress step and for the success/failure verdict. Tests
//! plug in `ScriptedOutcomes` to get a fixed sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws the random parts of a simulation tick.
pub trait OutcomeSource {
    /// Progress increment in `min..=max`.
    fn step(&mut self, min: u8, max: u8) -> u8;

    /// Whether a job that just reached 100% should end as failed.
    fn fails(&mut self, probability: f64) -> bool;
}

/// Uniform draws backed by a `StdRng`.
pub struct RandomOutcomes {
    rng: StdRng,
}

impl RandomOutcomes {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomOutcomes {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeSource for RandomOutcomes {
    fn step(&mut self, min: u8, max: u8) -> u8 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    fn fails(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(clamp_probability(probability))
    }
}

/// Clamps to `[0, 1]`; NaN counts as never.
pub fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

/// Replays queued steps and verdicts in order.
///
/// Once a queue runs dry, steps fall back to `max` and verdicts to success.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct ScriptedOutcomes {
    steps: std::collections::VecDeque<u8>,
    verdicts: std::collections::VecDeque<bool>,
}

#[cfg(test)]
impl ScriptedOutcomes {
    pub fn new(steps: impl IntoIterator<Item = u8>, verdicts: impl IntoIterator<Item = bool>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            verdicts: verdicts.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl OutcomeSource for ScriptedOutcomes {
    fn step(&mut self, min: u8, max: u8) -> u8 {
        self.steps.pop_front().unwrap_or(max).clamp(min, max)
    }

    fn fails(&mut self, _probability: f64) -> bool {
        self.verdicts.pop_front().unwrap_or(false)
    }
}
