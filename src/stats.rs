//! Tracking and reporting of sampler statistics: acceptance probability,
//! replay timing, and basic posterior summaries of collected draws.

use core::fmt;
use std::time::Duration;

use ndarray::Array1;
use num_traits::ToPrimitive;

/// Per-chain acceptance and timing counters, updated on every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Proposals attempted (including ones rejected before replay).
    pub proposed: u64,
    /// Proposals accepted.
    pub accepted: u64,
    /// Wall time spent replaying the program, including chain
    /// initialization.
    pub replay_time: Duration,
}

impl ChainStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    pub(crate) fn absorb(&mut self, other: &ChainStats) {
        self.proposed += other.proposed;
        self.accepted += other.accepted;
        self.replay_time += other.replay_time;
    }
}

/// Statistics of one completed driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// MH steps taken, summed over chains.
    pub steps: u64,
    /// Steps accepted.
    pub accepted: u64,
    /// Temperature swaps proposed (0 outside of parallel tempering).
    pub swaps_proposed: u64,
    /// Temperature swaps accepted.
    pub swaps_accepted: u64,
    /// Total wall time of the run.
    pub elapsed: Duration,
    /// Wall time spent inside trace replay.
    pub replay_time: Duration,
}

impl RunStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.accepted as f64 / self.steps as f64
        }
    }

    pub fn swap_acceptance_rate(&self) -> f64 {
        if self.swaps_proposed == 0 {
            0.0
        } else {
            self.swaps_accepted as f64 / self.swaps_proposed as f64
        }
    }

    /// Fraction of the total wall time spent replaying traces.
    pub fn replay_fraction(&self) -> f64 {
        if self.elapsed.is_zero() {
            0.0
        } else {
            self.replay_time.as_secs_f64() / self.elapsed.as_secs_f64()
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted {}/{} steps ({:.1}%), total time {:.2?}, replay {:.1}%",
            self.accepted,
            self.steps,
            100.0 * self.acceptance_rate(),
            self.elapsed,
            100.0 * self.replay_fraction(),
        )?;
        if self.swaps_proposed > 0 {
            write!(
                f,
                ", swaps {}/{} ({:.1}%)",
                self.swaps_accepted,
                self.swaps_proposed,
                100.0 * self.swap_acceptance_rate(),
            )?;
        }
        Ok(())
    }
}

/// Five-number-style summary of a collection of scalar draws.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct BasicStats {
    pub name: String,
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl fmt::Display for BasicStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in [{:.3}, {:.3}], median: {:.3}, mean: {:.3} ± {:.3}",
            self.name, self.min, self.max, self.median, self.mean, self.std
        )
    }
}

/// Summarizes a non-empty sample of scalar draws (posterior return values,
/// record values, acceptance diagnostics).
///
/// # Panics
///
/// Panics on an empty sample or on values that cannot be converted to `f64`.
pub fn basic_stats<T>(name: &str, sample: &[T]) -> BasicStats
where
    T: ToPrimitive,
{
    assert!(!sample.is_empty(), "basic_stats needs a non-empty sample");
    let mut values: Vec<f64> = sample
        .iter()
        .map(|x| {
            x.to_f64()
                .expect("Expected conversion of draws to f64 to succeed")
        })
        .collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    };
    let (min, max) = (values[0], values[values.len() - 1]);

    let arr = Array1::from_vec(values);
    let mean = arr.mean().expect("Expected computing the mean to succeed");
    let std = if arr.len() > 1 { arr.std(1.0) } else { 0.0 };

    BasicStats {
        name: name.to_string(),
        min,
        median,
        max,
        mean,
        std,
    }
}
