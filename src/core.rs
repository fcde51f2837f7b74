/*!
# Core Utilities.

The error surface shared by every component, plus the two sampling primitives
that do not need a Markov chain: rejection sampling (also the initialization
path for MH chains) and forward sampling.

Unseeded entry points draw a fresh seed from the thread RNG; the `_with_seed`
variants are deterministic.
*/

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::trace::{Generative, Trace};

/// Everything that can go wrong inside the inference core.
///
/// `ImpossibleTrace` is recoverable and handled at the nearest sampler
/// boundary: rejection sampling discards the trace and retries, and an MH
/// step treats the proposal as rejected. The other two kinds are fatal and
/// propagate to the driver.
#[derive(Debug, Error)]
pub enum McmcError {
    /// The current execution has probability zero: an explicit
    /// zero-probability abort, or an ERP whose log-density came out `-inf`.
    #[error("impossible trace: execution has probability zero")]
    ImpossibleTrace,

    /// A structural invariant of the trace machinery was broken (unbalanced
    /// address stack, duplicate address, replay-prefix violation, NaN in a
    /// log-probability accumulator).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid sampler options or ERP parameters.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl McmcError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        McmcError::InvariantViolation(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        McmcError::ConfigurationError(msg.into())
    }
}

/// Draws `n_samples` return values, each from an independent
/// rejection-initialized trace (repeat the program until its posterior is
/// finite, keep the result).
pub fn rejection_sample<P>(program: &P, n_samples: usize) -> Result<Vec<P::Output>, McmcError>
where
    P: Generative,
    P::Output: Clone,
{
    rejection_sample_with_seed(program, n_samples, rand::rng().random::<u64>())
}

/// Deterministic variant of [`rejection_sample`].
pub fn rejection_sample_with_seed<P>(
    program: &P,
    n_samples: usize,
    seed: u64,
) -> Result<Vec<P::Output>, McmcError>
where
    P: Generative,
    P::Output: Clone,
{
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let trace = Trace::init(program, &mut rng)?;
        out.push(
            trace
                .return_value()
                .cloned()
                .expect("Expected an initialized trace to carry a return value"),
        );
    }
    Ok(out)
}

/// Runs the program once, with no rejection on the likelihood.
pub fn forward_sample<P>(program: &P) -> Result<P::Output, McmcError>
where
    P: Generative,
    P::Output: Clone,
{
    forward_sample_with_seed(program, rand::rng().random::<u64>())
}

/// Deterministic variant of [`forward_sample`].
pub fn forward_sample_with_seed<P>(program: &P, seed: u64) -> Result<P::Output, McmcError>
where
    P: Generative,
    P::Output: Clone,
{
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut trace = Trace::new();
    trace.run(program, &mut rng)?;
    Ok(trace
        .return_value()
        .cloned()
        .expect("Expected a completed run to carry a return value"))
}
