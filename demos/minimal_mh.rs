use trace_mcmc::core::McmcError;
use trace_mcmc::metropolis_hastings::{MetropolisHastings, MHOptions};
use trace_mcmc::trace::{Generative, TraceCtx};

/// The smallest possible model: a single biased coin.
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

fn main() {
    let opts = MHOptions {
        n_samples: 2000,
        ..MHOptions::default()
    };
    let mut mh = MetropolisHastings::with_seed(BiasedCoin { p: 0.3 }, opts, 42)
        .expect("Expected building the sampler to succeed");

    let (draws, stats) = mh.collect().expect("Expected sampling to succeed");

    let heads = draws.iter().filter(|b| **b).count();
    println!(
        "heads fraction: {:.3} (target 0.3), {stats}",
        heads as f64 / draws.len() as f64
    );
    assert_eq!(draws.len(), 2000);
}

#[cfg(test)]
mod tests {
    use super::main;

    #[test]
    fn test_main() {
        main();
    }
}
