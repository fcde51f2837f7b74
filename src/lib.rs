//! # Trace MCMC
//!
//! A compact Rust library for **trace-based probabilistic programming**: write
//! a generative procedure that draws random choices from primitive
//! distributions (`flip`, `uniform`, `multinomial`, `gaussian`) and declares
//! likelihood adjustments, then sample from its posterior with **lightweight
//! Metropolis–Hastings** or its **parallel-tempering** variant.
//!
//! Every random choice is recorded in a structured trace under an address
//! derived from the procedure's lexical structure, so re-executions reuse
//! prior choices even when control flow depends on them. The MH kernel
//! proposes a change to a single choice, replays the procedure, and corrects
//! the acceptance ratio for choices the control-flow change created or
//! destroyed.
//!
//! ## Example 1: Posterior of a Gaussian mean (Metropolis–Hastings)
//!
//! ```rust
//! use trace_mcmc::core::McmcError;
//! use trace_mcmc::distributions::gaussian_logpdf;
//! use trace_mcmc::metropolis_hastings::{MetropolisHastings, MHOptions};
//! use trace_mcmc::stats::basic_stats;
//! use trace_mcmc::trace::{Generative, TraceCtx};
//!
//! // x ~ N(0, 1), observe 1.2 with noise 0.5.
//! #[derive(Clone)]
//! struct GaussianMean {
//!     observed: f64,
//!     noise: f64,
//! }
//!
//! impl Generative for GaussianMean {
//!     type Output = f64;
//!
//!     fn generate(&self, ctx: &mut TraceCtx<'_, f64>) -> Result<f64, McmcError> {
//!         let x = ctx.scoped(0, |c| c.gaussian(0.0, 1.0))?;
//!         ctx.factor(gaussian_logpdf(self.observed, x, self.noise))?;
//!         Ok(x)
//!     }
//! }
//!
//! let model = GaussianMean { observed: 1.2, noise: 0.5 };
//! let opts = MHOptions { n_samples: 2000, ..MHOptions::default() };
//! let mut mh = MetropolisHastings::with_seed(model, opts, 42).unwrap();
//! let (draws, stats) = mh.collect().unwrap();
//!
//! println!("{}", basic_stats("posterior mean", &draws));
//! println!("{stats}");
//! assert_eq!(draws.len(), 2000);
//! ```
//!
//! ## Example 2: Control flow over random choices
//!
//! The identity of a choice is its *address*, not its position: wrap each
//! callsite in [`TraceCtx::scoped`](trace::TraceCtx::scoped) (or raw
//! push/pop), and inside loops push one frame and call
//! [`TraceCtx::set_loop_index`](trace::TraceCtx::set_loop_index) at the top
//! of every iteration — the core cannot infer loop boundaries.
//!
//! ```rust
//! use trace_mcmc::core::{rejection_sample_with_seed, McmcError};
//! use trace_mcmc::trace::{Generative, TraceCtx};
//!
//! #[derive(Clone)]
//! struct HeadsRun {
//!     n: usize,
//! }
//!
//! impl Generative for HeadsRun {
//!     type Output = usize;
//!
//!     fn generate(&self, ctx: &mut TraceCtx<'_, usize>) -> Result<usize, McmcError> {
//!         let mut heads = 0;
//!         ctx.push_address(0);
//!         for i in 0..self.n {
//!             ctx.set_loop_index(i as u32)?;
//!             if ctx.scoped(0, |c| c.flip(0.5))? {
//!                 heads += 1;
//!             }
//!         }
//!         ctx.pop_address()?;
//!         Ok(heads)
//!     }
//! }
//!
//! let draws = rejection_sample_with_seed(&HeadsRun { n: 10 }, 100, 7).unwrap();
//! assert!(draws.iter().all(|h| *h <= 10));
//! ```
//!
//! ## Example 3: Parallel tempering
//!
//! ```rust
//! use trace_mcmc::core::McmcError;
//! use trace_mcmc::metropolis_hastings::{MHOptions, PTOptions, ParallelTempering};
//! use trace_mcmc::trace::{Generative, TraceCtx};
//!
//! #[derive(Clone)]
//! struct Coin;
//!
//! impl Generative for Coin {
//!     type Output = bool;
//!
//!     fn generate(&self, ctx: &mut TraceCtx<'_, bool>) -> Result<bool, McmcError> {
//!         ctx.scoped(0, |c| c.flip(0.5))
//!     }
//! }
//!
//! let opts = MHOptions { n_samples: 200, ..MHOptions::default() };
//! let pt = PTOptions { temps: vec![1.0, 2.0, 4.0], temp_swap_interval: 10 };
//! let mut ladder = ParallelTempering::with_seed(Coin, opts, pt, 42).unwrap();
//!
//! // The callback fires for every chain; keep the cold draws.
//! let mut cold = Vec::new();
//! ladder
//!     .run(|trace, temp| {
//!         if temp == 1.0 {
//!             cold.push(*trace.return_value().unwrap());
//!         }
//!     })
//!     .unwrap();
//! assert!(!cold.is_empty());
//! ```
//!
//! ## Features
//! - **Structured traces** with address-based reuse across replays
//! - **Lightweight MH** with the structural acceptance correction
//! - **Parallel tempering** with adjacent temperature swaps
//! - **Rejection and forward sampling** for initialization and priors
//! - **Deterministic seeding** throughout (`with_seed` constructors)
//! - **Acceptance and replay-time statistics**, optional progress bars

pub mod address;
pub mod core;
pub mod distributions;
pub mod metropolis_hastings;
pub mod stats;
pub mod trace;
