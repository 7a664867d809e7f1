//! Persistence of MCMC samples.
//!
//! The sampler streams every step through a [`SampleSink`]. On disk the sink is a
//! tab-separated table ([`tsv::TsvSampleWriter`]) located in a [`TablesDir`].

pub mod tables;
pub mod tsv;

pub use tables::TablesDir;
pub use tsv::{read_samples, SampleTable, TsvSampleWriter};

use crate::error::Result;

/// Destination for the rows produced by a sampling run.
pub trait SampleSink {
    /// Appends one parameter vector as a complete record.
    fn write_sample(&mut self, sample: &[f64]) -> Result<()>;
}

/// Keeps samples in memory, mostly useful for tests and short runs.
impl SampleSink for Vec<Vec<f64>> {
    fn write_sample(&mut self, sample: &[f64]) -> Result<()> {
        self.push(sample.to_vec());
        Ok(())
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn write_sample(&mut self, sample: &[f64]) -> Result<()> {
        (**self).write_sample(sample)
    }
}
