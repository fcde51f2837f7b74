#[cfg(test)]
mod tests {
    use trace_mcmc::core::McmcError;
    use trace_mcmc::metropolis_hastings::{MetropolisHastings, MHOptions};
    use trace_mcmc::trace::{Generative, TraceCtx};

    // ------------------------------------------------------------------------
    // 1) Biased coin
    //
    // The posterior equals the prior (no likelihood), so the chain's stationary
    // distribution of return values is Bernoulli(0.3). The flip proposal
    // deterministically negates the bit, so the acceptance ratio reduces to
    // p(new)/p(old).
    // ------------------------------------------------------------------------

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

    #[test]
    fn biased_coin_posterior_mean() {
        const SAMPLE_SIZE: usize = 20_000;
        const SEED: u64 = 42;

        let opts = MHOptions {
            n_samples: SAMPLE_SIZE,
            ..MHOptions::default()
        };
        let mut mh = MetropolisHastings::with_seed(BiasedCoin { p: 0.3 }, opts, SEED).unwrap();
        let (draws, stats) = mh.collect().unwrap();

        assert_eq!(draws.len(), SAMPLE_SIZE);
        assert!(stats.acceptance_rate() > 0.0);

        let mean = draws.iter().filter(|b| **b).count() as f64 / draws.len() as f64;
        assert!(
            (mean - 0.3).abs() < 0.02,
            "Expected heads fraction near 0.3, got {mean}"
        );
    }

    // ------------------------------------------------------------------------
    // 2) Control-flow switch
    //
    // The flip decides which branch samples; the abandoned branch's gaussian
    // must be swept out and the new branch's sampled fresh on every accepted
    // flip, keeping the return values bimodal at ±5 with equal occupancy.
    // ------------------------------------------------------------------------

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
    fn control_flow_switch_is_bimodal() {
        const SAMPLE_SIZE: usize = 20_000;
        const SEED: u64 = 7;

        let opts = MHOptions {
            n_samples: SAMPLE_SIZE,
            ..MHOptions::default()
        };
        let mut mh = MetropolisHastings::with_seed(Switch, opts, SEED).unwrap();
        let (draws, _stats) = mh.collect().unwrap();

        let positive = draws.iter().filter(|x| **x > 0.0).count() as f64 / draws.len() as f64;
        assert!(
            (positive - 0.5).abs() < 0.03,
            "Expected both modes visited evenly, got positive fraction {positive}"
        );

        let mean_abs = draws.iter().map(|x| x.abs()).sum::<f64>() / draws.len() as f64;
        assert!(
            (mean_abs - 5.0).abs() < 0.15,
            "Expected draws concentrated near ±5, got mean |x| = {mean_abs}"
        );
    }
}
