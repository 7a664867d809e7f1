/*!
# Metropolis–Hastings Sampler

A random-walk Metropolis–Hastings sampler for a [`Target`] density, driven by a
[`Proposal`]. The sampler owns a number of walkers that all start from the same
initial state and run one after another; each walker's state after every step
is appended to a [`SampleSink`], so rejected proposals repeat the previous row.

## Overview

- **Walker scheduling**: the requested number of points is split across walkers
  with [`distribute_among_walkers`].
- **Acceptance**: see [`accept`]. A proposal with higher log-density is always
  taken; otherwise it is taken with probability `exp(Δ)`.
- **Reproducibility**: [`MetropolisHastings::set_seed`] gives walker `k` the seed
  `seed + k`.

## Example Usage

```rust
use epi_mcmc::distributions::{Target, UniformStep};
use epi_mcmc::metropolis_hastings::MetropolisHastings;

struct StandardNormal;

impl Target for StandardNormal {
    fn unnorm_log_prob(&self, theta: &[f64]) -> epi_mcmc::Result<f64> {
        Ok(-0.5 * theta.iter().map(|x| x * x).sum::<f64>())
    }
}

let proposal = UniformStep::new(vec![1.0, 1.0]).unwrap();
let mh = MetropolisHastings::new(StandardNormal, proposal, &[0.0, 0.0], 2)
    .unwrap()
    .set_seed(42);

let mut samples: Vec<Vec<f64>> = Vec::new();
let summary = mh.run(1_001, &mut samples).unwrap();
assert_eq!(samples.len(), 1_001);
assert_eq!(summary.walkers[0].steps, 501);
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::prelude::*;

use crate::core::{distribute_among_walkers, run_chain, run_chain_with_progress, MarkovChain};
use crate::distributions::{Proposal, Target};
use crate::error::{Error, Result};
use crate::io::SampleSink;
use crate::stats::AcceptanceTracker;

/// The Metropolis acceptance rule in log space.
///
/// Returns `true` without touching `rng` when `log_p_new > log_p_current`.
/// Otherwise draws `u ~ Uniform(0, 1)` and accepts iff
/// `u < exp(log_p_new - log_p_current)`.
pub fn accept<R: Rng + ?Sized>(log_p_new: f64, log_p_current: f64, rng: &mut R) -> bool {
    if log_p_new > log_p_current {
        return true;
    }
    let u: f64 = rng.gen();
    u < (log_p_new - log_p_current).exp()
}

/// The Metropolis–Hastings sampler.
///
/// # Type Parameters
/// - `D`: The target distribution type. Must implement [`Target`].
/// - `Q`: The proposal distribution type. Must implement [`Proposal`]; each
///   walker receives its own clone.
#[derive(Debug, Clone)]
pub struct MetropolisHastings<D, Q> {
    /// The target distribution we want to sample from.
    pub target: D,
    /// The proposal distribution used to generate candidate states.
    pub proposal: Q,
    /// Starting state shared by every walker.
    pub initial_state: Vec<f64>,
    /// Number of walkers the points are distributed across.
    pub n_walkers: usize,
    /// The global random seed.
    pub seed: u64,
}

/// A single walker: the chain state plus its private randomness.
#[derive(Debug, Clone)]
pub struct MHWalker<'a, D, Q> {
    /// The target distribution to sample from.
    pub target: &'a D,
    /// The proposal distribution used to generate candidate states.
    pub proposal: Q,
    /// The current state of the chain.
    pub current_state: Vec<f64>,
    /// Cached unnormalized log-density of `current_state`.
    pub current_log_prob: f64,
    /// The walker-specific random seed.
    pub seed: u64,
    rng: SmallRng,
    tracker: AcceptanceTracker,
}

/// Outcome of one walker.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkerSummary {
    pub steps: usize,
    pub accepted: u64,
    pub final_state: Vec<f64>,
    pub final_log_prob: f64,
}

impl WalkerSummary {
    pub fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.accepted as f64 / self.steps as f64
        }
    }
}

/// Outcome of a full multi-walker run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub walkers: Vec<WalkerSummary>,
}

impl RunSummary {
    /// Rows appended to the sink, one per step.
    pub fn rows_written(&self) -> usize {
        self.walkers.iter().map(|w| w.steps).sum()
    }

    pub fn acceptance_rate(&self) -> f64 {
        let rows = self.rows_written();
        if rows == 0 {
            return 0.0;
        }
        self.walkers.iter().map(|w| w.accepted).sum::<u64>() as f64 / rows as f64
    }
}

impl<D, Q> MetropolisHastings<D, Q>
where
    D: Target,
    Q: Proposal + Clone,
{
    /**
    Constructs a sampler with `n_walkers` walkers, all starting at `initial_state`.

    The seed is drawn from entropy; call [`set_seed`](Self::set_seed) for a
    reproducible run.
    */
    pub fn new(target: D, proposal: Q, initial_state: &[f64], n_walkers: usize) -> Result<Self> {
        if n_walkers == 0 {
            return Err(Error::InvalidConfig(
                "the number of walkers must be positive".to_string(),
            ));
        }
        if initial_state.is_empty() {
            return Err(Error::InvalidConfig(
                "the initial state must have at least one parameter".to_string(),
            ));
        }
        Ok(Self {
            target,
            proposal,
            initial_state: initial_state.to_vec(),
            n_walkers,
            seed: thread_rng().gen::<u64>(),
        })
    }

    /// Sets the global seed. Walker `k` (0-based) is seeded with `seed + k`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Creates walker `index` (0-based) at the initial state.
    pub fn walker(&self, index: usize, initial_log_prob: f64) -> MHWalker<'_, D, Q> {
        MHWalker::new(
            &self.target,
            self.proposal.clone(),
            &self.initial_state,
            initial_log_prob,
            self.seed.wrapping_add(index as u64),
        )
    }

    /// Evaluates the target at the initial state.
    ///
    /// A NaN log-density is [`Error::NonFiniteSolution`].
    pub fn initial_log_prob(&self) -> Result<f64> {
        let log_prob = self.target.unnorm_log_prob(&self.initial_state)?;
        if log_prob.is_nan() {
            return Err(Error::NonFiniteSolution {
                parameters: self.initial_state.clone(),
            });
        }
        debug!(
            "initial state {:?} has log-probability {}",
            self.initial_state, log_prob
        );
        Ok(log_prob)
    }

    /// Runs every walker in turn, writing `n_points` rows to `sink` in total.
    pub fn run<S: SampleSink + ?Sized>(&self, n_points: usize, sink: &mut S) -> Result<RunSummary> {
        let initial_log_prob = self.initial_log_prob()?;
        self.run_from(initial_log_prob, n_points, sink, false)
    }

    /// Like [`run`](Self::run), with one progress bar per walker.
    pub fn run_progress<S: SampleSink + ?Sized>(
        &self,
        n_points: usize,
        sink: &mut S,
    ) -> Result<RunSummary> {
        let initial_log_prob = self.initial_log_prob()?;
        self.run_from(initial_log_prob, n_points, sink, true)
    }

    /**
    Runs every walker from the initial state whose log-density the caller has
    already computed with [`initial_log_prob`](Self::initial_log_prob).

    The target is evaluated exactly once per step and never at the initial
    state.
    */
    pub fn run_from<S: SampleSink + ?Sized>(
        &self,
        initial_log_prob: f64,
        n_points: usize,
        sink: &mut S,
        progress: bool,
    ) -> Result<RunSummary> {
        let steps_per_walker = distribute_among_walkers(n_points, self.n_walkers)?;
        if initial_log_prob.is_nan() {
            return Err(Error::NonFiniteSolution {
                parameters: self.initial_state.clone(),
            });
        }

        let style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let mut summary = RunSummary::default();
        for (index, &n_steps) in steps_per_walker.iter().enumerate() {
            let number = index + 1;
            let mut walker = self.walker(index, initial_log_prob);
            info!("walker {number}: running {n_steps} steps (seed {})", walker.seed);

            if progress {
                let pb = ProgressBar::new(n_steps as u64);
                pb.set_prefix(format!("walker {number}"));
                pb.set_style(style.clone());
                run_chain_with_progress(&mut walker, number, n_steps, &mut *sink, &pb)?;
                pb.finish_with_message("Done!");
            } else {
                run_chain(&mut walker, number, n_steps, &mut *sink)?;
            }

            let walker_summary = walker.summary();
            info!(
                "walker {number}: acceptance rate {:.3}, final log-probability {}",
                walker_summary.acceptance_rate(),
                walker_summary.final_log_prob
            );
            summary.walkers.push(walker_summary);
        }
        Ok(summary)
    }
}

impl<'a, D, Q> MHWalker<'a, D, Q>
where
    D: Target,
    Q: Proposal,
{
    /// Creates a walker at `initial_state`, whose log-density is already known.
    ///
    /// The acceptance draws and the proposal draws come from two streams that
    /// are both derived from `seed`.
    pub fn new(
        target: &'a D,
        proposal: Q,
        initial_state: &[f64],
        initial_log_prob: f64,
        seed: u64,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let proposal = proposal.set_seed(rng.gen());
        Self {
            target,
            proposal,
            current_state: initial_state.to_vec(),
            current_log_prob: initial_log_prob,
            seed,
            rng,
            tracker: AcceptanceTracker::new(),
        }
    }

    pub fn tracker(&self) -> &AcceptanceTracker {
        &self.tracker
    }

    pub fn summary(&self) -> WalkerSummary {
        WalkerSummary {
            steps: self.tracker.n() as usize,
            accepted: self.tracker.n_accepted(),
            final_state: self.current_state.clone(),
            final_log_prob: self.current_log_prob,
        }
    }
}

impl<D, Q> MarkovChain for MHWalker<'_, D, Q>
where
    D: Target,
    Q: Proposal,
{
    /**
    Performs one Metropolis–Hastings update step.

    The candidate is accepted by [`accept`] on the raw target log-densities of
    the candidate and of the current state. No proposal density enters the
    test, so a candidate with a strictly higher log-density is always taken.
    */
    fn step(&mut self) -> Result<&[f64]> {
        let proposed = self.proposal.sample(&self.current_state);
        let proposed_lp = self.target.unnorm_log_prob(&proposed)?;
        if proposed_lp.is_nan() {
            return Err(Error::NonFiniteSolution {
                parameters: proposed,
            });
        }

        let accepted = accept(proposed_lp, self.current_log_prob, &mut self.rng);
        if accepted {
            self.current_state = proposed;
            self.current_log_prob = proposed_lp;
        }
        self.tracker.record(accepted);
        Ok(&self.current_state)
    }

    /// Returns a reference to the current state of the chain.
    fn current_state(&self) -> &[f64] {
        &self.current_state
    }
}
