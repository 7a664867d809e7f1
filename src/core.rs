use indicatif::ProgressBar;

use crate::error::{Error, Result};
use crate::io::SampleSink;

pub trait MarkovChain {
    /// Does one iteration of the chain, returning the new current state.
    fn step(&mut self) -> Result<&[f64]>;

    /// Get the current state without stepping.
    fn current_state(&self) -> &[f64];
}

/// Splits `n_points` across `n_walkers` as evenly as possible.
///
/// Every walker gets `n_points / n_walkers` steps and the first
/// `n_points % n_walkers` walkers get one more, so the counts sum to
/// `n_points` and differ by at most one.
///
/// ```rust
/// use epi_mcmc::core::distribute_among_walkers;
///
/// assert_eq!(distribute_among_walkers(10, 3).unwrap(), vec![4, 3, 3]);
/// assert!(distribute_among_walkers(10, 0).is_err());
/// ```
pub fn distribute_among_walkers(n_points: usize, n_walkers: usize) -> Result<Vec<usize>> {
    if n_walkers == 0 {
        return Err(Error::InvalidConfig(
            "the number of walkers must be positive".to_string(),
        ));
    }
    let base = n_points / n_walkers;
    let remainder = n_points % n_walkers;
    Ok((0..n_walkers)
        .map(|k| if k < remainder { base + 1 } else { base })
        .collect())
}

/// Runs `chain` for `n_steps`, writing the state after every step to `sink`.
///
/// Any failure is wrapped in [`Error::Sampling`] with the walker index, the
/// step and the state the step started from.
pub fn run_chain<M, S>(chain: &mut M, walker: usize, n_steps: usize, sink: &mut S) -> Result<()>
where
    M: MarkovChain,
    S: SampleSink + ?Sized,
{
    run_chain_inner(chain, walker, n_steps, sink, None)
}

pub fn run_chain_with_progress<M, S>(
    chain: &mut M,
    walker: usize,
    n_steps: usize,
    sink: &mut S,
    pb: &ProgressBar,
) -> Result<()>
where
    M: MarkovChain,
    S: SampleSink + ?Sized,
{
    pb.set_length(n_steps as u64);
    run_chain_inner(chain, walker, n_steps, sink, Some(pb))
}

fn run_chain_inner<M, S>(
    chain: &mut M,
    walker: usize,
    n_steps: usize,
    sink: &mut S,
    pb: Option<&ProgressBar>,
) -> Result<()>
where
    M: MarkovChain,
    S: SampleSink + ?Sized,
{
    for step in 0..n_steps {
        let from = chain.current_state().to_vec();
        let wrap = |source: Error| Error::Sampling {
            walker,
            step,
            parameters: from.clone(),
            source: Box::new(source),
        };
        let state = chain.step().map_err(wrap)?;
        sink.write_sample(state).map_err(wrap)?;

        if let Some(pb) = pb {
            pb.inc(1);
        }
    }
    Ok(())
}
