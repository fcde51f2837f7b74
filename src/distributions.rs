/*!
# Elementary Random Procedures.

The four primitive distributions a generative procedure can draw from, as a
single tagged sum [`ErpKind`] carrying the distribution parameters. Every kind
knows how to `sample`, how to score a value (`logprob`), and how to `propose`
a single-site change together with the forward and reverse transition
log-probabilities that enter the Metropolis–Hastings ratio.

Values are the tagged union [`ErpValue`]: `flip` produces booleans,
`multinomial` produces indices, `uniform` and `gaussian` produce reals.

## Example

```rust
use rand::rngs::SmallRng;
use rand::SeedableRng;
use trace_mcmc::distributions::{ErpKind, ErpValue};

let mut rng = SmallRng::seed_from_u64(42);
let kind = ErpKind::Gaussian { mean: 0.0, stdev: 1.0 };
let value = kind.sample(&mut rng);
let logp = kind.logprob(&value);
assert!(logp.is_finite());
```
*/

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::core::McmcError;

/// The value drawn by an ERP. Which variant applies is fixed by the kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErpValue {
    Bool(bool),
    Real(f64),
    Index(usize),
}

impl ErpValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ErpValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            ErpValue::Real(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            ErpValue::Index(i) => Some(*i),
            _ => None,
        }
    }
}

/// Result of a proposal kernel: the candidate value plus the log-probability
/// of proposing it (`fwd_logp`) and of proposing the old value back from it
/// (`rvs_logp`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposed {
    pub value: ErpValue,
    pub fwd_logp: f64,
    pub rvs_logp: f64,
}

/// One of the four primitive distributions, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ErpKind {
    /// Bernoulli with success probability `p`.
    Flip { p: f64 },
    /// Continuous uniform on `[lo, hi]`.
    Uniform { lo: f64, hi: f64 },
    /// Categorical over `0..weights.len()`, proportional to the (possibly
    /// un-normalized) weights.
    Multinomial { weights: Vec<f64> },
    /// Normal with the given mean and standard deviation.
    Gaussian { mean: f64, stdev: f64 },
}

impl ErpKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErpKind::Flip { .. } => "flip",
            ErpKind::Uniform { .. } => "uniform",
            ErpKind::Multinomial { .. } => "multinomial",
            ErpKind::Gaussian { .. } => "gaussian",
        }
    }

    /// Whether `other` is the same primitive, regardless of parameters.
    pub fn same_kind(&self, other: &ErpKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Rejects parameterizations with no well-defined density.
    pub fn validate(&self) -> Result<(), McmcError> {
        match self {
            ErpKind::Flip { p } => {
                if !(0.0..=1.0).contains(p) {
                    return Err(McmcError::config(format!("flip: p={p} outside [0, 1]")));
                }
            }
            ErpKind::Uniform { lo, hi } => {
                if !lo.is_finite() || !hi.is_finite() || hi < lo {
                    return Err(McmcError::config(format!(
                        "uniform: invalid bounds [{lo}, {hi}]"
                    )));
                }
            }
            ErpKind::Multinomial { weights } => {
                if weights.is_empty() {
                    return Err(McmcError::config("multinomial: empty weight vector"));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(McmcError::config(
                        "multinomial: weights must be finite and non-negative",
                    ));
                }
                if weights.iter().sum::<f64>() <= 0.0 {
                    return Err(McmcError::config("multinomial: all weights are zero"));
                }
            }
            ErpKind::Gaussian { mean, stdev } => {
                if !mean.is_finite() || !stdev.is_finite() || *stdev <= 0.0 {
                    return Err(McmcError::config(format!(
                        "gaussian: invalid parameters mean={mean}, stdev={stdev}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Draws a value from the prior.
    pub fn sample(&self, rng: &mut SmallRng) -> ErpValue {
        match self {
            ErpKind::Flip { p } => ErpValue::Bool(rng.random_bool(p.clamp(0.0, 1.0))),
            ErpKind::Uniform { lo, hi } => ErpValue::Real(lo + (hi - lo) * rng.random::<f64>()),
            ErpKind::Multinomial { weights } => {
                let total: f64 = weights.iter().sum();
                ErpValue::Index(sample_weighted(weights, total, None, rng))
            }
            ErpKind::Gaussian { mean, stdev } => {
                let z: f64 = rng.sample(StandardNormal);
                ErpValue::Real(mean + stdev * z)
            }
        }
    }

    /// Log-density (or log-mass) of `value` under the current parameters.
    ///
    /// Returns `-inf` for impossible values, including values of the wrong
    /// variant for this kind.
    pub fn logprob(&self, value: &ErpValue) -> f64 {
        match (self, value) {
            (ErpKind::Flip { p }, ErpValue::Bool(b)) => {
                if *b {
                    p.ln()
                } else {
                    (1.0 - p).ln()
                }
            }
            (ErpKind::Uniform { lo, hi }, ErpValue::Real(x)) => {
                if x >= lo && x <= hi {
                    -(hi - lo).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            (ErpKind::Multinomial { weights }, ErpValue::Index(i)) => {
                if *i < weights.len() {
                    weights[*i].ln() - weights.iter().sum::<f64>().ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            (ErpKind::Gaussian { mean, stdev }, ErpValue::Real(x)) => {
                gaussian_logpdf(*x, *mean, *stdev)
            }
            _ => f64::NEG_INFINITY,
        }
    }

    /// The single-site proposal kernel used by the MH chain.
    ///
    /// - `flip` deterministically flips the bit (`fwd = rvs = 0`).
    /// - `uniform` and `gaussian` resample from the prior.
    /// - `multinomial` resamples from the prior conditioned on a change of
    ///   value; with no alternative mass left the move is impossible and the
    ///   step gets rejected.
    pub fn propose(&self, old: &ErpValue, rng: &mut SmallRng) -> Result<Proposed, McmcError> {
        match self {
            ErpKind::Flip { .. } => {
                let b = old
                    .as_bool()
                    .ok_or_else(|| McmcError::invariant("flip record holds a non-bool value"))?;
                Ok(Proposed {
                    value: ErpValue::Bool(!b),
                    fwd_logp: 0.0,
                    rvs_logp: 0.0,
                })
            }
            ErpKind::Uniform { .. } | ErpKind::Gaussian { .. } => {
                let value = self.sample(rng);
                Ok(Proposed {
                    fwd_logp: self.logprob(&value),
                    rvs_logp: self.logprob(old),
                    value,
                })
            }
            ErpKind::Multinomial { weights } => {
                let old_i = old.as_index().ok_or_else(|| {
                    McmcError::invariant("multinomial record holds a non-index value")
                })?;
                let total: f64 = weights.iter().sum();
                let remaining = total - weights.get(old_i).copied().unwrap_or(0.0);
                if remaining <= 0.0 {
                    // A one-outcome categorical has no move to make.
                    return Err(McmcError::ImpossibleTrace);
                }
                let new_i = sample_weighted(weights, remaining, Some(old_i), rng);
                Ok(Proposed {
                    value: ErpValue::Index(new_i),
                    fwd_logp: weights[new_i].ln() - remaining.ln(),
                    rvs_logp: weights[old_i].ln() - (total - weights[new_i]).ln(),
                })
            }
        }
    }
}

/// Normal log-density in closed form.
pub fn gaussian_logpdf(x: f64, mean: f64, stdev: f64) -> f64 {
    let z = (x - mean) / stdev;
    -0.5 * z * z - stdev.ln() - 0.5 * (2.0 * PI).ln()
}

/// Cumulative-scan draw over `weights` with total mass `total`, optionally
/// skipping one index (used by the change-conditioned multinomial kernel).
fn sample_weighted(
    weights: &[f64],
    total: f64,
    skip: Option<usize>,
    rng: &mut SmallRng,
) -> usize {
    let r = rng.random::<f64>() * total;
    let mut cum = 0.0;
    let mut chosen = 0;
    let mut any = false;
    for (i, &w) in weights.iter().enumerate() {
        if Some(i) == skip {
            continue;
        }
        cum += w;
        chosen = i;
        any = true;
        if r <= cum {
            break;
        }
    }
    debug_assert!(any, "sample_weighted called with no admissible index");
    chosen
}
