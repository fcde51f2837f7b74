/*!
# Structured ERP Traces.

A [`Trace`] records every random choice a generative procedure makes during
one execution, keyed by structural [`Address`](crate::address::Address). The
trace drives re-execution: when the procedure is replayed, choices whose
addresses survived keep their values (reuse), choices at new addresses are
sampled fresh, and choices whose addresses disappeared are swept out at the
end of the run. The sums accumulated along the way (`logprior`,
`loglikelihood`, `new_logprob`, `old_logprob`) are exactly the quantities the
lightweight Metropolis–Hastings acceptance ratio needs.

The procedure itself implements [`Generative`] and receives a [`TraceCtx`]
handle exposing the ERP calls (`flip`, `uniform`, `multinomial`, `gaussian`),
likelihood adjustments (`factor`, `likelihood`), and the address-stack
operations. Model arguments live in the implementing struct's fields.

## Example

```rust
use trace_mcmc::core::McmcError;
use trace_mcmc::trace::{Generative, Trace, TraceCtx};
use rand::rngs::SmallRng;
use rand::SeedableRng;

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

let mut rng = SmallRng::seed_from_u64(42);
let trace = Trace::init(&BiasedCoin { p: 0.3 }, &mut rng).unwrap();
assert_eq!(trace.records().count(), 1);
assert!(trace.logposterior().is_finite());
```

## Addressing contract

Every ERP callsite must be reached under a unique address: wrap each callsite
in its own [`TraceCtx::scoped`] frame (or a raw push/pop pair), and inside
loops push one frame for the loop and call [`TraceCtx::set_loop_index`] at the
top of every iteration. The core cannot infer loop boundaries; omitting the
loop index makes iterations collide on one address, which surfaces as a
duplicate-address invariant violation.
*/

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::SmallRng;

use crate::address::{Address, AddressStack};
use crate::core::McmcError;
use crate::distributions::{ErpKind, ErpValue};

/// A user-supplied generative procedure.
///
/// Implementors hold their own arguments (observations, hyperparameters) as
/// fields and draw random choices through the [`TraceCtx`] handle. The same
/// procedure value is re-executed many times during inference, so `generate`
/// takes `&self`.
pub trait Generative {
    type Output;

    fn generate(&self, ctx: &mut TraceCtx<'_, Self::Output>) -> Result<Self::Output, McmcError>;
}

/// One recorded random choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ErpRecord {
    address: Address,
    kind: ErpKind,
    value: ErpValue,
    depth: usize,
    logp: f64,
    index: usize,
    reachable: bool,
}

impl ErpRecord {
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The distribution (with the parameters from the latest visit).
    pub fn kind(&self) -> &ErpKind {
        &self.kind
    }

    pub fn value(&self) -> &ErpValue {
        &self.value
    }

    /// Address-stack depth at the time the record was created.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Log-density of the value under the latest parameters.
    pub fn logp(&self) -> f64 {
        self.logp
    }

    /// Sequential position in the execution order of the most recent run.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_value(&mut self, value: ErpValue) {
        self.value = value;
        self.logp = self.kind.logprob(&self.value);
    }
}

/// A full record of one execution of a generative procedure.
///
/// `T` is the procedure's return type. Cloning a trace clones every record by
/// value; the clone and the original never alias.
#[derive(Debug, Clone)]
pub struct Trace<T> {
    records: HashMap<Address, ErpRecord>,
    exec_order: Vec<Address>,
    logprior: f64,
    loglikelihood: f64,
    new_logprob: f64,
    old_logprob: f64,
    return_value: Option<T>,
    prop_var_index: Option<usize>,
    last_run_time: Duration,
}

impl<T> Default for Trace<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Trace<T> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            exec_order: Vec::new(),
            logprior: 0.0,
            loglikelihood: 0.0,
            new_logprob: 0.0,
            old_logprob: 0.0,
            return_value: None,
            prop_var_index: None,
            last_run_time: Duration::ZERO,
        }
    }

    /// Builds a trace and initializes it by rejection sampling.
    pub fn init<P>(program: &P, rng: &mut SmallRng) -> Result<Self, McmcError>
    where
        P: Generative<Output = T>,
    {
        let mut trace = Self::new();
        trace.rejection_sample(program, rng)?;
        Ok(trace)
    }

    /// Re-runs the program on a cleared trace until the posterior is finite.
    ///
    /// `ImpossibleTrace` failures are swallowed and retried; structural and
    /// configuration errors propagate. Runs forever on a program whose
    /// posterior is impossible with probability one.
    pub fn rejection_sample<P>(&mut self, program: &P, rng: &mut SmallRng) -> Result<(), McmcError>
    where
        P: Generative<Output = T>,
    {
        let mut attempts = 0u64;
        loop {
            attempts += 1;
            self.clear();
            match self.run(program, rng) {
                Ok(()) if self.logposterior() > f64::NEG_INFINITY => {
                    debug!("rejection sampling succeeded after {attempts} attempt(s)");
                    return Ok(());
                }
                Ok(()) => {}
                Err(McmcError::ImpossibleTrace) => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Executes the program, reusing recorded choices where addresses match.
    ///
    /// This is the replay algorithm at the heart of the sampler: it resets
    /// the per-run accumulators, visits the program, and finishes by sweeping
    /// records whose addresses were not reached (their log-density moves into
    /// `old_logprob`). The address stack must be balanced when the program
    /// returns.
    pub fn run<P>(&mut self, program: &P, rng: &mut SmallRng) -> Result<(), McmcError>
    where
        P: Generative<Output = T>,
    {
        let started = Instant::now();
        for rec in self.records.values_mut() {
            rec.reachable = false;
        }
        self.logprior = 0.0;
        self.loglikelihood = 0.0;
        self.new_logprob = 0.0;
        self.old_logprob = 0.0;
        self.exec_order.clear();
        self.return_value = None;

        let outcome = {
            let mut ctx = TraceCtx {
                trace: &mut *self,
                stack: AddressStack::new(),
                rng,
            };
            match program.generate(&mut ctx) {
                Ok(value) if ctx.stack.is_empty() => Ok(value),
                Ok(_) => Err(McmcError::invariant(
                    "address stack not empty at procedure exit",
                )),
                Err(e) => Err(e),
            }
        };
        self.last_run_time = started.elapsed();
        let value = outcome?;

        let stale: Vec<Address> = self
            .records
            .iter()
            .filter(|(_, rec)| !rec.reachable)
            .map(|(addr, _)| addr.clone())
            .collect();
        for addr in stale {
            if let Some(rec) = self.records.remove(&addr) {
                self.old_logprob += rec.logp;
            }
        }

        self.return_value = Some(value);
        Ok(())
    }

    /// Records of the last completed run, in execution order.
    pub fn records(&self) -> impl Iterator<Item = &ErpRecord> {
        self.exec_order.iter().map(|addr| &self.records[addr])
    }

    /// Number of records visited by the last run.
    pub fn len(&self) -> usize {
        self.exec_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exec_order.is_empty()
    }

    pub fn record_at(&self, index: usize) -> &ErpRecord {
        &self.records[&self.exec_order[index]]
    }

    pub(crate) fn record_at_mut(&mut self, index: usize) -> &mut ErpRecord {
        let addr = &self.exec_order[index];
        self.records
            .get_mut(addr)
            .expect("Expected a record for every executed address")
    }

    pub fn logprior(&self) -> f64 {
        self.logprior
    }

    pub fn loglikelihood(&self) -> f64 {
        self.loglikelihood
    }

    pub fn logposterior(&self) -> f64 {
        self.logprior + self.loglikelihood
    }

    /// Sum of log-densities of the choices freshly sampled on the last run.
    pub fn new_logprob(&self) -> f64 {
        self.new_logprob
    }

    /// Sum of log-densities of the choices swept out at the end of the last
    /// run.
    pub fn old_logprob(&self) -> f64 {
        self.old_logprob
    }

    /// The procedure's return value, present after a completed run.
    pub fn return_value(&self) -> Option<&T> {
        self.return_value.as_ref()
    }

    /// Wall time spent inside the most recent `run` call.
    pub fn last_run_time(&self) -> Duration {
        self.last_run_time
    }

    pub(crate) fn set_prop_var_index(&mut self, index: Option<usize>) {
        self.prop_var_index = index;
    }

    fn clear(&mut self) {
        self.records.clear();
        self.exec_order.clear();
        self.logprior = 0.0;
        self.loglikelihood = 0.0;
        self.new_logprob = 0.0;
        self.old_logprob = 0.0;
        self.return_value = None;
    }
}

/// The handle a generative procedure uses to interact with the trace that is
/// executing it: ERP draws, likelihood adjustments, and address management.
pub struct TraceCtx<'a, T> {
    trace: &'a mut Trace<T>,
    stack: AddressStack,
    rng: &'a mut SmallRng,
}

impl<T> TraceCtx<'_, T> {
    /// Bernoulli draw.
    pub fn flip(&mut self, p: f64) -> Result<bool, McmcError> {
        let value = self.lookup_or_sample(ErpKind::Flip { p })?;
        value
            .as_bool()
            .ok_or_else(|| McmcError::invariant("flip produced a non-bool value"))
    }

    /// Continuous uniform draw on `[lo, hi]`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> Result<f64, McmcError> {
        let value = self.lookup_or_sample(ErpKind::Uniform { lo, hi })?;
        value
            .as_real()
            .ok_or_else(|| McmcError::invariant("uniform produced a non-real value"))
    }

    /// Categorical draw over `0..weights.len()`, proportional to `weights`.
    pub fn multinomial(&mut self, weights: &[f64]) -> Result<usize, McmcError> {
        let value = self.lookup_or_sample(ErpKind::Multinomial {
            weights: weights.to_vec(),
        })?;
        value
            .as_index()
            .ok_or_else(|| McmcError::invariant("multinomial produced a non-index value"))
    }

    /// Normal draw.
    pub fn gaussian(&mut self, mean: f64, stdev: f64) -> Result<f64, McmcError> {
        let value = self.lookup_or_sample(ErpKind::Gaussian { mean, stdev })?;
        value
            .as_real()
            .ok_or_else(|| McmcError::invariant("gaussian produced a non-real value"))
    }

    /// Adds `logp` to the trace's log-likelihood. `-inf` is allowed and
    /// makes the trace impossible at the sampler boundary.
    pub fn factor(&mut self, logp: f64) -> Result<(), McmcError> {
        if logp.is_nan() {
            return Err(McmcError::invariant("NaN passed to factor"));
        }
        self.trace.loglikelihood += logp;
        Ok(())
    }

    /// Synonym of [`TraceCtx::factor`].
    pub fn likelihood(&mut self, logp: f64) -> Result<(), McmcError> {
        self.factor(logp)
    }

    /// Aborts the run as having probability zero. Rejection sampling retries
    /// the program; an MH proposal is rejected.
    pub fn reject<V>(&self) -> Result<V, McmcError> {
        Err(McmcError::ImpossibleTrace)
    }

    /// Enters a lexical site. Prefer [`TraceCtx::scoped`] where possible.
    pub fn push_address(&mut self, site: u32) {
        self.stack.push(site);
    }

    /// Leaves the innermost site.
    pub fn pop_address(&mut self) -> Result<(), McmcError> {
        self.stack.pop()
    }

    /// Distinguishes iterations of the enclosing loop frame. Must be called
    /// at the top of every iteration that draws random choices.
    pub fn set_loop_index(&mut self, index: u32) -> Result<(), McmcError> {
        self.stack.set_loop_index(index)
    }

    /// Runs `body` under a pushed site frame, popping it again on every exit
    /// path. The raw push/pop operations remain available for generated code.
    pub fn scoped<R>(
        &mut self,
        site: u32,
        body: impl FnOnce(&mut Self) -> Result<R, McmcError>,
    ) -> Result<R, McmcError> {
        self.stack.push(site);
        let out = body(self);
        self.stack.pop()?;
        out
    }

    /// Current address-stack depth.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// The ERP dispatch shared by all four draw methods: reuse a recorded
    /// choice when the address and kind match, otherwise sample fresh.
    fn lookup_or_sample(&mut self, kind: ErpKind) -> Result<ErpValue, McmcError> {
        kind.validate()?;
        let addr = self.stack.current();
        let depth = self.stack.depth();
        let index = self.trace.exec_order.len();
        let gated = matches!(self.trace.prop_var_index, Some(gate) if index <= gate);

        enum Hit {
            Reuse,
            Stale,
            Miss,
        }
        let hit = match self.trace.records.get(&addr) {
            None => Hit::Miss,
            Some(rec) if rec.reachable => {
                return Err(McmcError::invariant(format!(
                    "duplicate address {addr} within one run"
                )))
            }
            Some(rec) if rec.kind.same_kind(&kind) => Hit::Reuse,
            Some(_) => Hit::Stale,
        };

        match hit {
            Hit::Reuse => {
                let rec = self
                    .trace
                    .records
                    .get_mut(&addr)
                    .expect("Expected the record just looked up to still exist");
                rec.kind = kind;
                rec.logp = rec.kind.logprob(&rec.value);
                rec.reachable = true;
                rec.index = index;
                let (value, logp) = (rec.value, rec.logp);
                if logp.is_nan() {
                    return Err(McmcError::invariant(format!(
                        "NaN log-probability at {addr}"
                    )));
                }
                if logp == f64::NEG_INFINITY {
                    return Err(McmcError::ImpossibleTrace);
                }
                self.trace.logprior += logp;
                self.trace.exec_order.push(addr);
                Ok(value)
            }
            Hit::Stale | Hit::Miss => {
                // Records at or before the proposal site must replay from the
                // previous run; reaching this branch there means the replay
                // prefix diverged.
                if gated {
                    return Err(McmcError::invariant(format!(
                        "proposal replay required reuse at {addr} (index {index}) \
                         but found a {} choice",
                        if matches!(hit, Hit::Stale) {
                            "kind-mismatched"
                        } else {
                            "fresh"
                        }
                    )));
                }
                if matches!(hit, Hit::Stale) {
                    let old = self
                        .trace
                        .records
                        .remove(&addr)
                        .expect("Expected the stale record just looked up to still exist");
                    self.trace.old_logprob += old.logp;
                }
                let value = kind.sample(self.rng);
                let logp = kind.logprob(&value);
                if logp.is_nan() {
                    return Err(McmcError::invariant(format!(
                        "NaN log-probability at {addr}"
                    )));
                }
                if logp == f64::NEG_INFINITY {
                    return Err(McmcError::ImpossibleTrace);
                }
                self.trace.logprior += logp;
                self.trace.new_logprob += logp;
                self.trace.exec_order.push(addr.clone());
                self.trace.records.insert(
                    addr.clone(),
                    ErpRecord {
                        address: addr,
                        kind,
                        value,
                        depth,
                        logp,
                        index,
                        reachable: true,
                    },
                );
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    #[derive(Clone)]
    struct TwoGaussians;

    impl Generative for TwoGaussians {
        type Output = f64;

        fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
            let a = ctx.scoped(0, |c| c.gaussian(0.0, 1.0))?;
            let b = ctx.scoped(1, |c| c.gaussian(0.0, 2.0))?;
            Ok(a + b)
        }
    }

    #[derive(Clone)]
    struct Switch;

    impl Generative for Switch {
        type Output = f64;

        fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
            let heads = ctx.scoped(0, |c| c.flip(0.5))?;
            if heads {
                ctx.scoped(1, |c| c.gaussian(5.0, 1.0))
            } else {
                ctx.scoped(2, |c| c.gaussian(-5.0, 1.0))
            }
        }
    }

    #[test]
    fn run_accumulates_prior_and_likelihood() {
        #[derive(Clone)]
        struct WithFactor;

        impl Generative for WithFactor {
            type Output = f64;

            fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
                let x = ctx.scoped(0, |c| c.uniform(0.0, 2.0))?;
                ctx.factor(-1.25)?;
                ctx.likelihood(-0.25)?;
                Ok(x)
            }
        }

        let mut rng = rng(7);
        let mut trace = Trace::new();
        trace.run(&WithFactor, &mut rng).unwrap();

        assert_abs_diff_eq!(trace.logprior(), -(2.0f64.ln()), epsilon = 1e-12);
        assert_abs_diff_eq!(trace.loglikelihood(), -1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            trace.logposterior(),
            trace.logprior() + trace.loglikelihood(),
            epsilon = 1e-12
        );
        assert_eq!(trace.len(), 1);
        assert!(trace.return_value().is_some());
    }

    #[test]
    fn rerun_without_proposal_is_identical() {
        let mut rng = rng(11);
        let mut trace = Trace::new();
        trace.run(&TwoGaussians, &mut rng).unwrap();

        let mut copy = trace.clone();
        copy.run(&TwoGaussians, &mut rng).unwrap();

        assert_eq!(copy.len(), trace.len());
        assert_eq!(copy.new_logprob(), 0.0);
        assert_eq!(copy.old_logprob(), 0.0);
        assert_abs_diff_eq!(copy.logprior(), trace.logprior(), epsilon = 1e-12);
        assert_eq!(copy.return_value(), trace.return_value());
        for (a, b) in copy.records().zip(trace.records()) {
            assert_eq!(a.value(), b.value());
            assert_eq!(a.address(), b.address());
        }
    }

    #[test]
    fn fixed_seed_runs_are_deterministic() {
        let a = Trace::init(&Switch, &mut rng(123)).unwrap();
        let b = Trace::init(&Switch, &mut rng(123)).unwrap();
        assert_eq!(a.return_value(), b.return_value());
        assert_eq!(a.logprior(), b.logprior());
    }

    #[test]
    fn clone_does_not_alias() {
        let mut rng = rng(5);
        let trace = Trace::init(&TwoGaussians, &mut rng).unwrap();
        let mut copy = trace.clone();
        copy.record_at_mut(0).set_value(ErpValue::Real(99.0));
        assert_ne!(trace.record_at(0).value(), copy.record_at(0).value());
    }

    #[test]
    fn control_flow_divergence_splits_fresh_and_stale() {
        let mut rng = rng(3);
        let mut trace = Trace::init(&Switch, &mut rng).unwrap();
        let old_branch_logp = trace.record_at(1).logp();

        // Emulate a proposal at the flip: negate it and replay.
        let flipped = !trace.record_at(0).value().as_bool().unwrap();
        trace.record_at_mut(0).set_value(ErpValue::Bool(flipped));
        trace.set_prop_var_index(Some(0));
        trace.run(&Switch, &mut rng).unwrap();
        trace.set_prop_var_index(None);

        // The taken branch resampled fresh; the abandoned branch was swept.
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.record_at(0).value().as_bool(), Some(flipped));
        assert_abs_diff_eq!(
            trace.new_logprob(),
            trace.record_at(1).logp(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(trace.old_logprob(), old_branch_logp, epsilon = 1e-12);
    }

    #[test]
    fn structure_preserving_replay_has_no_fresh_or_stale_mass() {
        let mut rng = rng(17);
        let mut trace = Trace::init(&TwoGaussians, &mut rng).unwrap();

        trace.record_at_mut(1).set_value(ErpValue::Real(0.123));
        trace.set_prop_var_index(Some(1));
        trace.run(&TwoGaussians, &mut rng).unwrap();
        trace.set_prop_var_index(None);

        assert_eq!(trace.new_logprob(), 0.0);
        assert_eq!(trace.old_logprob(), 0.0);
        assert_eq!(trace.record_at(1).value().as_real(), Some(0.123));
    }

    #[test]
    fn replay_prefix_keeps_values() {
        let mut rng = rng(29);
        let mut trace = Trace::init(&TwoGaussians, &mut rng).unwrap();
        let first = *trace.record_at(0).value();

        trace.record_at_mut(1).set_value(ErpValue::Real(-4.0));
        trace.set_prop_var_index(Some(1));
        trace.run(&TwoGaussians, &mut rng).unwrap();
        trace.set_prop_var_index(None);

        assert_eq!(*trace.record_at(0).value(), first);
    }

    #[test]
    fn duplicate_address_is_detected() {
        #[derive(Clone)]
        struct Unscoped;

        impl Generative for Unscoped {
            type Output = bool;

            fn generate(&self, ctx: &mut TraceCtx<'_, bool>) -> Result<bool, McmcError> {
                let a = ctx.flip(0.5)?;
                let b = ctx.flip(0.5)?;
                Ok(a & b)
            }
        }

        let mut rng = rng(1);
        let mut trace = Trace::new();
        assert!(matches!(
            trace.run(&Unscoped, &mut rng),
            Err(McmcError::InvariantViolation(_))
        ));
    }

    #[test]
    fn unbalanced_stack_is_detected() {
        #[derive(Clone)]
        struct LeaksFrame;

        impl Generative for LeaksFrame {
            type Output = bool;

            fn generate(&self, ctx: &mut TraceCtx<'_, bool>) -> Result<bool, McmcError> {
                ctx.push_address(0);
                ctx.flip(0.5)
            }
        }

        let mut rng = rng(1);
        let mut trace = Trace::new();
        assert!(matches!(
            trace.run(&LeaksFrame, &mut rng),
            Err(McmcError::InvariantViolation(_))
        ));
    }

    #[test]
    fn loop_frames_give_each_iteration_its_own_address() {
        #[derive(Clone)]
        struct Loop {
            n: usize,
        }

        impl Generative for Loop {
            type Output = usize;

            fn generate(&self, ctx: &mut TraceCtx<'_, usize>) -> Result<usize, McmcError> {
                let mut heads = 0;
                ctx.push_address(0);
                for i in 0..self.n {
                    ctx.set_loop_index(i as u32)?;
                    if ctx.scoped(0, |c| c.flip(0.5))? {
                        heads += 1;
                    }
                }
                ctx.pop_address()?;
                Ok(heads)
            }
        }

        let mut rng = rng(13);
        let trace = Trace::init(&Loop { n: 8 }, &mut rng).unwrap();
        assert_eq!(trace.len(), 8);
        assert!(trace.records().all(|rec| rec.depth() == 2));
    }

    #[test]
    fn rejection_sampling_discards_impossible_traces() {
        #[derive(Clone)]
        struct Truncated;

        impl Generative for Truncated {
            type Output = f64;

            fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
                let x = ctx.scoped(0, |c| c.uniform(0.0, 10.0))?;
                if x <= 7.0 {
                    ctx.factor(f64::NEG_INFINITY)?;
                }
                Ok(x)
            }
        }

        let mut rng = rng(19);
        for _ in 0..20 {
            let trace = Trace::init(&Truncated, &mut rng).unwrap();
            let x = *trace.return_value().unwrap();
            assert!(x > 7.0 && x <= 10.0);
            assert!(trace.logposterior().is_finite());
        }
    }

    #[test]
    fn explicit_reject_aborts_the_run() {
        #[derive(Clone)]
        struct AlwaysRejects;

        impl Generative for AlwaysRejects {
            type Output = f64;

            fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
                let x = ctx.scoped(0, |c| c.uniform(0.0, 1.0))?;
                if x < 2.0 {
                    return ctx.reject();
                }
                Ok(x)
            }
        }

        let mut rng = rng(23);
        let mut trace = Trace::new();
        assert!(matches!(
            trace.run(&AlwaysRejects, &mut rng),
            Err(McmcError::ImpossibleTrace)
        ));
    }
}
