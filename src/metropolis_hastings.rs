/*!
# Metropolis–Hastings over Structured Traces.

The lightweight MH transition kernel: propose a new value for a single random
choice, replay the program with that choice pinned, and accept or reject using
an acceptance ratio that charges for choices created by the control-flow
change and credits choices destroyed by it.

Three layers:

- [`MHChain`]: one Markov chain — a trace, a likelihood temperature, and a
  chain-owned RNG.
- [`MetropolisHastings`]: the single-chain driver — iteration and time
  budgets, sample emission through a callback, optional progress reporting.
- [`ParallelTempering`]: a sequentially simulated ladder of chains at
  different likelihood temperatures with periodic adjacent temperature swaps.

## Example

```rust
use trace_mcmc::core::McmcError;
use trace_mcmc::metropolis_hastings::{MetropolisHastings, MHOptions};
use trace_mcmc::trace::{Generative, TraceCtx};

#[derive(Clone)]
struct BiasedCoin {
    p: f64,
}

impl Generative for BiasedCoin {
    type Output = bool;

    fn generate(&self, ctx: &mut TraceCtx<'_, bool>) -> Result<bool, McmcError> {
        ctx.scoped(0, |ctx| ctx.flip(self.p))
    }
}

let opts = MHOptions {
    n_samples: 500,
    ..MHOptions::default()
};
let mut mh = MetropolisHastings::with_seed(BiasedCoin { p: 0.3 }, opts, 42).unwrap();
let (draws, stats) = mh.collect().unwrap();
assert_eq!(draws.len(), 500);
assert!(stats.acceptance_rate() > 0.0);
```
*/

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::core::McmcError;
use crate::stats::{ChainStats, RunStats};
use crate::trace::{Generative, Trace};

/// Seed offset separating the swap-selection RNG from the chain RNGs.
const SWAP_SEED_OFFSET: u64 = 0x9E3779B97F4A7C15;

/// Options of the single-chain driver. The same options (minus `temperature`)
/// also parameterize every chain of a tempering ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct MHOptions {
    /// Total samples to emit.
    pub n_samples: usize,
    /// Iterations per emitted sample; the total iteration count is
    /// `lag * n_samples`.
    pub lag: usize,
    /// Wall-clock cap; supersedes `n_samples` when exceeded.
    pub time_budget: Option<Duration>,
    /// Progress bar while running plus a statistics line on completion.
    pub verbose: bool,
    /// Likelihood temperature. The prior is never tempered.
    pub temperature: f64,
    /// Weight proposal-site selection by `exp(-depth)` instead of uniformly.
    pub depth_biased_var_select: bool,
}

impl Default for MHOptions {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            lag: 1,
            time_budget: None,
            verbose: false,
            temperature: 1.0,
            depth_biased_var_select: false,
        }
    }
}

impl MHOptions {
    fn validate(&self) -> Result<(), McmcError> {
        if self.n_samples == 0 {
            return Err(McmcError::config("n_samples must be positive"));
        }
        if self.lag == 0 {
            return Err(McmcError::config("lag must be positive"));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(McmcError::config(format!(
                "temperature must be positive and finite, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Extra options of the parallel-tempering driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PTOptions {
    /// Likelihood temperature ladder, one entry per chain. The ordering is
    /// the caller's; swaps are only ever proposed between adjacent entries.
    pub temps: Vec<f64>,
    /// Steps every chain advances between swap proposals.
    pub temp_swap_interval: usize,
}

impl PTOptions {
    fn validate(&self) -> Result<(), McmcError> {
        if self.temps.len() < 2 {
            return Err(McmcError::config(
                "parallel tempering needs at least 2 temperatures",
            ));
        }
        if self
            .temps
            .iter()
            .any(|t| !t.is_finite() || *t <= 0.0)
        {
            return Err(McmcError::config(
                "temperatures must be positive and finite",
            ));
        }
        if self.temp_swap_interval == 0 {
            return Err(McmcError::config("temp_swap_interval must be positive"));
        }
        Ok(())
    }
}

/// A single Markov chain over traces of `P`.
pub struct MHChain<P: Generative> {
    program: P,
    trace: Trace<P::Output>,
    temperature: f64,
    rng: SmallRng,
    stats: ChainStats,
}

impl<P> MHChain<P>
where
    P: Generative,
    P::Output: Clone,
{
    /// Builds a chain whose initial trace is drawn by rejection sampling.
    pub fn new(program: P, temperature: f64, seed: u64) -> Result<Self, McmcError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let replay_started = Instant::now();
        let trace = Trace::init(&program, &mut rng)?;
        let stats = ChainStats {
            replay_time: replay_started.elapsed(),
            ..ChainStats::default()
        };
        Ok(Self {
            program,
            trace,
            temperature,
            rng,
            stats,
        })
    }

    /// Builds a chain from an existing trace (used by tempering ladders so
    /// that all chains start from the same state).
    fn with_trace(program: P, trace: Trace<P::Output>, temperature: f64, seed: u64) -> Self {
        Self {
            program,
            trace,
            temperature,
            rng: SmallRng::seed_from_u64(seed),
            stats: ChainStats::default(),
        }
    }

    pub fn trace(&self) -> &Trace<P::Output> {
        &self.trace
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    /// One Metropolis–Hastings step. Returns whether the proposal was
    /// accepted.
    ///
    /// An [`McmcError::ImpossibleTrace`] raised while proposing or replaying
    /// counts as a rejection; structural and configuration errors propagate.
    pub fn step(&mut self, depth_biased: bool) -> Result<bool, McmcError> {
        let n = self.trace.len();
        if n == 0 {
            // Nothing random to propose; the state is deterministic.
            return Ok(false);
        }

        let mut new = self.trace.clone();
        let (k, fwd_var_lp) = if depth_biased {
            select_depth_biased(&new, &mut self.rng)
        } else {
            (self.rng.random_range(0..n), -(n as f64).ln())
        };

        self.stats.proposed += 1;
        let proposed = {
            let rec = new.record_at_mut(k);
            match rec.kind().clone().propose(rec.value(), &mut self.rng) {
                Ok(prop) => {
                    rec.set_value(prop.value);
                    prop
                }
                Err(McmcError::ImpossibleTrace) => return Ok(false),
                Err(e) => return Err(e),
            }
        };

        new.set_prop_var_index(Some(k));
        let replayed = new.run(&self.program, &mut self.rng);
        new.set_prop_var_index(None);
        self.stats.replay_time += new.last_run_time();
        match replayed {
            Ok(()) => {}
            Err(McmcError::ImpossibleTrace) => return Ok(false),
            Err(e) => return Err(e),
        }

        let fwd_lp = proposed.fwd_logp + fwd_var_lp + new.new_logprob();
        let rvs_var_lp = if depth_biased {
            depth_biased_logweight(&new, k)
        } else {
            -(new.len() as f64).ln()
        };
        let rvs_lp = proposed.rvs_logp + rvs_var_lp + new.old_logprob();

        let t = self.temperature;
        let delta = (new.logprior() + new.loglikelihood() / t)
            - (self.trace.logprior() + self.trace.loglikelihood() / t)
            + rvs_lp
            - fwd_lp;

        let u: f64 = self.rng.random();
        if u.ln() < delta {
            self.trace = new;
            self.stats.accepted += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Draws a proposal site with probability proportional to `exp(-depth)` and
/// returns it with its selection log-probability.
fn select_depth_biased<T>(trace: &Trace<T>, rng: &mut SmallRng) -> (usize, f64) {
    let total: f64 = trace.records().map(|rec| depth_weight(rec.depth())).sum();
    let r = rng.random::<f64>() * total;
    let mut cum = 0.0;
    let mut k = trace.len() - 1;
    for (i, rec) in trace.records().enumerate() {
        cum += depth_weight(rec.depth());
        if r <= cum {
            k = i;
            break;
        }
    }
    (k, depth_biased_logweight(trace, k))
}

/// Selection log-probability of index `k` under depth-biased weighting.
fn depth_biased_logweight<T>(trace: &Trace<T>, k: usize) -> f64 {
    let total: f64 = trace.records().map(|rec| depth_weight(rec.depth())).sum();
    depth_weight(trace.record_at(k).depth()).ln() - total.ln()
}

fn depth_weight(depth: usize) -> f64 {
    (-(depth as f64)).exp()
}

/// The single-chain driver.
pub struct MetropolisHastings<P: Generative> {
    chain: MHChain<P>,
    opts: MHOptions,
}

impl<P> MetropolisHastings<P>
where
    P: Generative,
    P::Output: Clone,
{
    /// Validates options and initializes the chain with a seed drawn from the
    /// thread RNG.
    pub fn new(program: P, opts: MHOptions) -> Result<Self, McmcError> {
        Self::with_seed(program, opts, rand::rng().random::<u64>())
    }

    /// Deterministic variant of [`MetropolisHastings::new`].
    pub fn with_seed(program: P, opts: MHOptions, seed: u64) -> Result<Self, McmcError> {
        opts.validate()?;
        let chain = MHChain::new(program, opts.temperature, seed)?;
        Ok(Self { chain, opts })
    }

    pub fn chain(&self) -> &MHChain<P> {
        &self.chain
    }

    /// Runs the chain, invoking `on_sample` with the current trace every
    /// `lag` iterations.
    pub fn run<F>(&mut self, mut on_sample: F) -> Result<RunStats, McmcError>
    where
        F: FnMut(&Trace<P::Output>),
    {
        let started = Instant::now();
        let stats_before = self.chain.stats();
        let iters = self.opts.lag * self.opts.n_samples;

        let progress = self.opts.verbose.then(|| {
            let pb = ProgressBar::new(iters as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{prefix:8} {bar:40.cyan/blue} {pos}/{len} ({eta}) | {msg}")
                    .expect("Expected the progress template to parse")
                    .progress_chars("=>-"),
            );
            pb.set_prefix("MH");
            pb
        });

        'steps: for i in 1..=iters {
            self.chain.step(self.opts.depth_biased_var_select)?;
            if i % self.opts.lag == 0 {
                on_sample(self.chain.trace());
                if let Some(pb) = &progress {
                    pb.set_position(i as u64);
                    pb.set_message(format!(
                        "p(accept)≈{:.2}",
                        self.chain.stats().acceptance_rate()
                    ));
                }
            }
            if let Some(budget) = self.opts.time_budget {
                if started.elapsed() >= budget {
                    debug!("time budget exhausted after {i} iterations");
                    break 'steps;
                }
            }
        }

        if let Some(pb) = progress {
            pb.finish();
        }

        let stats_now = self.chain.stats();
        let run_stats = RunStats {
            steps: stats_now.proposed - stats_before.proposed,
            accepted: stats_now.accepted - stats_before.accepted,
            swaps_proposed: 0,
            swaps_accepted: 0,
            elapsed: started.elapsed(),
            replay_time: stats_now.replay_time - stats_before.replay_time,
        };
        if self.opts.verbose {
            println!("{run_stats}");
        }
        Ok(run_stats)
    }

    /// Runs the chain and collects the emitted return values.
    pub fn collect(&mut self) -> Result<(Vec<P::Output>, RunStats), McmcError> {
        let mut draws = Vec::with_capacity(self.opts.n_samples);
        let stats = self.run(|trace| {
            draws.push(
                trace
                    .return_value()
                    .cloned()
                    .expect("Expected a completed run to carry a return value"),
            );
        })?;
        Ok((draws, stats))
    }
}

/// The parallel-tempering driver: a ladder of chains at different likelihood
/// temperatures, advanced round-robin on a single thread, with periodic
/// adjacent temperature swaps.
pub struct ParallelTempering<P: Generative> {
    chains: Vec<MHChain<P>>,
    opts: MHOptions,
    pt: PTOptions,
    swap_rng: SmallRng,
}

impl<P> ParallelTempering<P>
where
    P: Generative + Clone,
    P::Output: Clone,
{
    /// Validates options and initializes the ladder with a seed drawn from
    /// the thread RNG.
    pub fn new(program: P, opts: MHOptions, pt: PTOptions) -> Result<Self, McmcError> {
        Self::with_seed(program, opts, pt, rand::rng().random::<u64>())
    }

    /// Deterministic variant of [`ParallelTempering::new`].
    ///
    /// The first chain's trace is drawn by rejection sampling and duplicated
    /// into the rest, so all chains start from an identical state; chain `i`
    /// is seeded with `seed + i`.
    pub fn with_seed(
        program: P,
        opts: MHOptions,
        pt: PTOptions,
        seed: u64,
    ) -> Result<Self, McmcError> {
        opts.validate()?;
        pt.validate()?;

        let first = MHChain::new(program.clone(), pt.temps[0], seed)?;
        let mut chains = Vec::with_capacity(pt.temps.len());
        for (i, &temp) in pt.temps.iter().enumerate().skip(1) {
            chains.push(MHChain::with_trace(
                program.clone(),
                first.trace().clone(),
                temp,
                seed.wrapping_add(i as u64),
            ));
        }
        let mut all = vec![first];
        all.append(&mut chains);

        Ok(Self {
            chains: all,
            opts,
            pt,
            swap_rng: SmallRng::seed_from_u64(seed.wrapping_add(SWAP_SEED_OFFSET)),
        })
    }

    pub fn chains(&self) -> &[MHChain<P>] {
        &self.chains
    }

    /// Runs the ladder. `on_sample` fires for **every** chain at its own lag
    /// boundary and receives the chain's current temperature; posterior
    /// consumers typically keep only draws with temperature 1.
    pub fn run<F>(&mut self, mut on_sample: F) -> Result<RunStats, McmcError>
    where
        F: FnMut(&Trace<P::Output>, f64),
    {
        let started = Instant::now();
        let iters = self.opts.lag * self.opts.n_samples;
        let mut swaps_proposed = 0u64;
        let mut swaps_accepted = 0u64;
        let mut done = 0usize;

        'rounds: while done < iters {
            let burst = self.pt.temp_swap_interval.min(iters - done);
            for chain in &mut self.chains {
                for j in 1..=burst {
                    chain.step(self.opts.depth_biased_var_select)?;
                    if (done + j) % self.opts.lag == 0 {
                        on_sample(chain.trace(), chain.temperature());
                    }
                    if let Some(budget) = self.opts.time_budget {
                        if started.elapsed() >= budget {
                            debug!("time budget exhausted during tempering round");
                            break 'rounds;
                        }
                    }
                }
            }
            done += burst;

            // Adjacent swap proposal: exchange temperatures only, comparing
            // likelihoods under the pre-swap temperatures. Only the
            // likelihood is tempered; the prior cancels out of the ratio.
            swaps_proposed += 1;
            let j = self.swap_rng.random_range(0..self.chains.len() - 1);
            let (t_lo, t_hi) = (self.chains[j].temperature, self.chains[j + 1].temperature);
            let (ll_lo, ll_hi) = (
                self.chains[j].trace().loglikelihood(),
                self.chains[j + 1].trace().loglikelihood(),
            );
            let delta = (ll_lo / t_hi + ll_hi / t_lo) - (ll_lo / t_lo + ll_hi / t_hi);
            let u: f64 = self.swap_rng.random();
            if u.ln() < delta {
                self.chains[j].temperature = t_hi;
                self.chains[j + 1].temperature = t_lo;
                swaps_accepted += 1;
                debug!("swapped temperatures {t_lo} <-> {t_hi} at ladder position {j}");
            }
        }

        let mut totals = ChainStats::default();
        for chain in &self.chains {
            totals.absorb(&chain.stats());
        }
        let run_stats = RunStats {
            steps: totals.proposed,
            accepted: totals.accepted,
            swaps_proposed,
            swaps_accepted,
            elapsed: started.elapsed(),
            replay_time: totals.replay_time,
        };
        if self.opts.verbose {
            println!("{run_stats}");
        }
        Ok(run_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceCtx;
    use approx::assert_abs_diff_eq;

    #[derive(Clone)]
    struct BiasedCoin {
        p: f64,
    }

    impl Generative for BiasedCoin {
        type Output = bool;

        fn generate(&self, ctx: &mut TraceCtx<'_, bool>) -> Result<bool, McmcError> {
            ctx.scoped(0, |c| c.flip(self.p))
        }
    }

    /// One shallow gaussian plus `deep` more nested under a recursion-like
    /// chain of frames.
    #[derive(Clone)]
    struct DeepModel {
        deep: usize,
    }

    impl Generative for DeepModel {
        type Output = f64;

        fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
            fn descend(
                ctx: &mut TraceCtx<'_, f64>,
                remaining: usize,
            ) -> Result<f64, McmcError> {
                ctx.scoped(1, |c| {
                    let x = c.scoped(0, |c| c.gaussian(0.0, 1.0))?;
                    if remaining == 0 {
                        Ok(x)
                    } else {
                        Ok(x + descend(c, remaining - 1)?)
                    }
                })
            }

            let shallow = ctx.scoped(0, |c| c.gaussian(0.0, 1.0))?;
            Ok(shallow + descend(ctx, self.deep - 1)?)
        }
    }

    #[test]
    fn chain_steps_and_tracks_acceptance() {
        let mut chain = MHChain::new(BiasedCoin { p: 0.3 }, 1.0, 42).unwrap();
        let mut accepts = 0;
        for _ in 0..200 {
            if chain.step(false).unwrap() {
                accepts += 1;
            }
        }
        assert_eq!(chain.stats().proposed, 200);
        assert_eq!(chain.stats().accepted, accepts);
        assert!(accepts > 0);
    }

    #[test]
    fn fixed_structure_proposals_reduce_to_plain_mh() {
        // With a single gaussian and no control flow, every replay reuses the
        // proposed value and the structural terms vanish.
        #[derive(Clone)]
        struct OneGaussian;

        impl Generative for OneGaussian {
            type Output = f64;

            fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
                ctx.scoped(0, |c| c.gaussian(0.0, 1.0))
            }
        }

        let mut chain = MHChain::new(OneGaussian, 1.0, 7).unwrap();
        for _ in 0..100 {
            chain.step(false).unwrap();
            assert_eq!(chain.trace().new_logprob(), 0.0);
            assert_eq!(chain.trace().old_logprob(), 0.0);
        }
    }

    #[test]
    fn depth_biased_selection_concentrates_on_shallow_records() {
        let mut rng = SmallRng::seed_from_u64(42);
        let trace = Trace::init(&DeepModel { deep: 10 }, &mut rng).unwrap();

        let n = 20_000;
        let (mut biased_depth, mut uniform_depth) = (0.0, 0.0);
        for _ in 0..n {
            let (k, _) = select_depth_biased(&trace, &mut rng);
            biased_depth += trace.record_at(k).depth() as f64;
            let k = rng.random_range(0..trace.len());
            uniform_depth += trace.record_at(k).depth() as f64;
        }
        // exp(-depth) weighting concentrates selection on shallow records;
        // uniform selection lands on the deep majority.
        assert!(biased_depth / (n as f64) < uniform_depth / n as f64);
    }

    #[test]
    fn depth_biased_logweights_normalize() {
        let mut rng = SmallRng::seed_from_u64(1);
        let trace = Trace::init(&DeepModel { deep: 5 }, &mut rng).unwrap();
        let total: f64 = (0..trace.len())
            .map(|k| depth_biased_logweight(&trace, k).exp())
            .sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_options_are_rejected_before_running() {
        let opts = MHOptions {
            temperature: 0.0,
            ..MHOptions::default()
        };
        assert!(matches!(
            MetropolisHastings::with_seed(BiasedCoin { p: 0.5 }, opts, 1),
            Err(McmcError::ConfigurationError(_))
        ));

        let pt = PTOptions {
            temps: vec![1.0],
            temp_swap_interval: 10,
        };
        assert!(matches!(
            ParallelTempering::with_seed(BiasedCoin { p: 0.5 }, MHOptions::default(), pt, 1),
            Err(McmcError::ConfigurationError(_))
        ));
    }

    #[test]
    fn lag_thins_emitted_samples() {
        let opts = MHOptions {
            n_samples: 50,
            lag: 4,
            ..MHOptions::default()
        };
        let mut mh = MetropolisHastings::with_seed(BiasedCoin { p: 0.5 }, opts, 9).unwrap();
        let mut emitted = 0;
        let stats = mh.run(|_| emitted += 1).unwrap();
        assert_eq!(emitted, 50);
        assert_eq!(stats.steps, 200);
    }

    #[test]
    fn time_budget_stops_early() {
        let opts = MHOptions {
            n_samples: usize::MAX / 2,
            time_budget: Some(Duration::from_millis(20)),
            ..MHOptions::default()
        };
        let mut mh = MetropolisHastings::with_seed(BiasedCoin { p: 0.5 }, opts, 3).unwrap();
        let stats = mh.run(|_| {}).unwrap();
        assert!(stats.steps < (usize::MAX / 2) as u64);
    }

    #[test]
    fn equal_temperatures_always_swap() {
        let opts = MHOptions {
            n_samples: 200,
            ..MHOptions::default()
        };
        let pt = PTOptions {
            temps: vec![1.0, 1.0, 1.0],
            temp_swap_interval: 10,
        };
        let mut ladder =
            ParallelTempering::with_seed(BiasedCoin { p: 0.4 }, opts, pt, 5).unwrap();
        let stats = ladder.run(|_, _| {}).unwrap();
        assert!(stats.swaps_proposed > 0);
        assert_eq!(stats.swaps_accepted, stats.swaps_proposed);
    }

    #[test]
    fn tempering_keeps_the_temperature_multiset() {
        let opts = MHOptions {
            n_samples: 300,
            ..MHOptions::default()
        };
        let pt = PTOptions {
            temps: vec![1.0, 2.0, 4.0],
            temp_swap_interval: 5,
        };
        let mut ladder =
            ParallelTempering::with_seed(BiasedCoin { p: 0.4 }, opts, pt, 11).unwrap();
        ladder.run(|_, _| {}).unwrap();
        let mut temps: Vec<f64> = ladder.chains().iter().map(|c| c.temperature()).collect();
        temps.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(temps, vec![1.0, 2.0, 4.0]);
    }
}
