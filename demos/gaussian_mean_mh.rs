//! Infers the mean of a Gaussian from one noisy observation and compares the
//! posterior sample against the analytic conjugate answer.

use trace_mcmc::core::McmcError;
use trace_mcmc::distributions::gaussian_logpdf;
use trace_mcmc::metropolis_hastings::{MetropolisHastings, MHOptions};
use trace_mcmc::stats::basic_stats;
use trace_mcmc::trace::{Generative, TraceCtx};

/// x ~ N(0, 1); observe `observed` with noise `noise`.
#[derive(Clone)]
struct GaussianMean {
    observed: f64,
    noise: f64,
}

impl Generative for GaussianMean {
    type Output = f64;

    fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
        let x = ctx.scoped(0, |c| c.gaussian(0.0, 1.0))?;
        ctx.factor(gaussian_logpdf(self.observed, x, self.noise))?;
        Ok(x)
    }
}

fn main() {
    const SAMPLE_SIZE: usize = 20_000;
    const SEED: u64 = 42;

    let model = GaussianMean {
        observed: 1.2,
        noise: 0.5,
    };

    // Conjugate posterior: precision 1/1 + 1/0.25, mean pulled toward the
    // observation.
    let posterior_precision = 1.0 + 1.0 / (model.noise * model.noise);
    let posterior_mean = model.observed / (model.noise * model.noise) / posterior_precision;

    let opts = MHOptions {
        n_samples: SAMPLE_SIZE,
        verbose: true,
        ..MHOptions::default()
    };
    let mut mh = MetropolisHastings::with_seed(model, opts, SEED)
        .expect("Expected building the sampler to succeed");
    let (draws, _stats) = mh.collect().expect("Expected sampling to succeed");

    let summary = basic_stats("posterior of x", &draws);
    println!("{summary}");
    println!(
        "analytic mean: {:.3}, analytic std: {:.3}",
        posterior_mean,
        (1.0 / posterior_precision).sqrt()
    );
}
