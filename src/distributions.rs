/*!
Target and proposal distributions for random-walk Metropolis–Hastings.

A [`Target`] returns an unnormalized log-density, which may fail: for a model
calibration the density requires solving an ODE, and a divergent solve is an
error rather than a NaN. A [`Proposal`] draws a candidate from the current
state. The only proposal shipped is [`UniformStep`], a box-shaped random walk.

# Examples

```rust
use epi_mcmc::distributions::{Proposal, UniformStep};

let mut proposal = UniformStep::new(vec![0.1, 2.0]).unwrap().set_seed(7);
let candidate = proposal.sample(&[1.0, 10.0]);
assert!((candidate[0] - 1.0).abs() <= 0.1);
assert!((candidate[1] - 10.0).abs() <= 2.0);
```
*/

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use crate::error::{Error, Result};

/// A trait for continuous target distributions from which we want to sample.
pub trait Target {
    /// Returns the log of the unnormalized density for state `theta`.
    fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64>;
}

impl<T: Target + ?Sized> Target for &T {
    fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64> {
        (**self).unnorm_log_prob(theta)
    }
}

/// A trait for generating proposals in Metropolis–Hastings.
pub trait Proposal {
    /// Samples a new point from q(x' | x).
    fn sample(&mut self, current: &[f64]) -> Vec<f64>;

    /// Returns a new instance of this proposal distribution seeded with `seed`.
    fn set_seed(self, seed: u64) -> Self;
}

/**
Random walk that moves every coordinate independently by `u * step[i]` with
`u ~ Uniform(-1, 1)`.

The proposal is symmetric, so the acceptance test only compares target
log-densities.
*/
#[derive(Debug, Clone)]
pub struct UniformStep {
    steps: Vec<f64>,
    unit: Uniform<f64>,
    rng: SmallRng,
}

impl UniformStep {
    /// Creates a proposal with one maximum displacement per parameter.
    ///
    /// Steps must be finite and non-negative; a zero step freezes that parameter.
    pub fn new(steps: Vec<f64>) -> Result<Self> {
        if let Some(bad) = steps.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(Error::InvalidConfig(format!(
                "step sizes must be finite and non-negative, got {bad}"
            )));
        }
        Ok(Self {
            steps,
            unit: Uniform::new_inclusive(-1.0, 1.0),
            rng: SmallRng::from_entropy(),
        })
    }

    pub fn steps(&self) -> &[f64] {
        &self.steps
    }

    pub fn dim(&self) -> usize {
        self.steps.len()
    }
}

impl Proposal for UniformStep {
    fn sample(&mut self, current: &[f64]) -> Vec<f64> {
        current
            .iter()
            .zip(&self.steps)
            .map(|(&x, &h)| x + self.unit.sample(&mut self.rng) * h)
            .collect()
    }

    fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}
