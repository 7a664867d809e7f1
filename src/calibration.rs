/*!
# Calibration of a compartmental model

[`Calibration`] ties a [`CompartmentalModel`] to a [`Dataset`] together with a
first guess of the parameters. It evaluates the chi-squared objective, exposes
the corresponding log-likelihood as a [`Target`], and runs the
Metropolis–Hastings sampler straight into a sample table.

The last entry of every parameter vector is the base-10 exponent of the initial
size of the first compartment; the solver is started from
`[10^p[last], rescaling_by, 0, 0]`.

# Example

```rust
use epi_mcmc::calibration::{Calibration, SamplingOptions};
use epi_mcmc::io::TablesDir;
use epi_mcmc::model::{CompartmentalModel, InitialConditions, Trajectory};
use epi_mcmc::objective::FitSeries;

/// confirmed(t) = slope * t
struct Line;

impl CompartmentalModel for Line {
    fn solve(&self, p: &[f64], _x0: &InitialConditions, t_end: f64) -> epi_mcmc::Result<Trajectory> {
        let days: Vec<f64> = (0..=t_end as usize).map(|d| d as f64).collect();
        let confirmed = days.iter().map(|t| p[0] * t).collect();
        let zeros = vec![0.0; days.len()];
        Trajectory::new(days, confirmed, zeros.clone(), zeros)
    }
}

let data = Trajectory::new(
    vec![0.0, 1.0, 2.0, 3.0],
    vec![0.0, 1.0, 2.0, 3.0],
    vec![0.0; 4],
    vec![0.0; 4],
)?;
let calibration = Calibration::new(data, Line, vec![1.0, 0.0])?;
assert_eq!(calibration.chi_squared(&[1.0, 0.0], FitSeries::confirmed_only())?, 0.0);

let tmp = tempfile::tempdir()?;
let tables = TablesDir::open(tmp.path())?;
let options = SamplingOptions::new(100, vec![0.05, 0.0])
    .overwrite(true)
    .seed(1)
    .fit(FitSeries::confirmed_only());
let summary = calibration.metropolis_hastings(&options, &tables)?;
assert_eq!(summary.rows_written(), 100);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

use log::{debug, info};

use crate::distributions::{Target, UniformStep};
use crate::error::{Error, Result};
use crate::io::{TablesDir, TsvSampleWriter};
use crate::metropolis_hastings::{MetropolisHastings, RunSummary};
use crate::model::{CompartmentalModel, Dataset, InitialConditions, Trajectory};
use crate::objective::{chi_squared, FitSeries};

/// Default labels `p1, p2, ..., p{ndim}`.
pub fn default_labels(ndim: usize) -> Vec<String> {
    (1..=ndim).map(|i| format!("p{i}")).collect()
}

/// A model, its observations and a first guess of the parameters.
#[derive(Debug, Clone)]
pub struct Calibration<M, D> {
    model: M,
    data: D,
    par_est: Vec<f64>,
    par_labels: Vec<String>,
    rescaling_by: f64,
    t_end: f64,
}

impl<M, D> Calibration<M, D>
where
    M: CompartmentalModel,
    D: Dataset,
{
    /// Creates a calibration with labels `p1..p{ndim}`, no rescaling and the
    /// dataset's last day as time horizon.
    pub fn new(data: D, model: M, par_est: Vec<f64>) -> Result<Self> {
        if par_est.is_empty() {
            return Err(Error::InvalidConfig(
                "the parameter estimate must not be empty".to_string(),
            ));
        }
        if par_est.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "the parameter estimate must be finite, got {par_est:?}"
            )));
        }
        data.observations().check_lengths()?;
        data.observations().check_finite()?;
        let t_end = data.t_end().ok_or_else(|| {
            Error::InvalidConfig("the dataset has no observations".to_string())
        })?;
        let par_labels = default_labels(par_est.len());

        Ok(Self {
            model,
            data,
            par_est,
            par_labels,
            rescaling_by: 1.0,
            t_end,
        })
    }

    /// Replaces the parameter labels; there must be exactly one per parameter.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.ndim() {
            return Err(Error::DimensionMismatch {
                what: "parameter labels",
                expected: self.ndim(),
                got: labels.len(),
            });
        }
        self.par_labels = labels;
        Ok(self)
    }

    /// Sets the second initial condition handed to the solver.
    pub fn with_rescaling(mut self, rescaling_by: f64) -> Self {
        self.rescaling_by = rescaling_by;
        self
    }

    /// Overrides the time horizon taken from the dataset.
    pub fn with_t_end(mut self, t_end: f64) -> Result<Self> {
        if !t_end.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "the time horizon must be finite, got {t_end}"
            )));
        }
        self.t_end = t_end;
        Ok(self)
    }

    pub fn ndim(&self) -> usize {
        self.par_est.len()
    }

    pub fn par_est(&self) -> &[f64] {
        &self.par_est
    }

    pub fn labels(&self) -> &[String] {
        &self.par_labels
    }

    pub fn rescaling_by(&self) -> f64 {
        self.rescaling_by
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn data(&self) -> &Trajectory {
        self.data.observations()
    }

    fn check_dim(&self, parameters: &[f64]) -> Result<()> {
        if parameters.len() != self.ndim() {
            return Err(Error::DimensionMismatch {
                what: "parameter vector",
                expected: self.ndim(),
                got: parameters.len(),
            });
        }
        Ok(())
    }

    /// `[10^p[last], rescaling_by, 0, 0]`.
    pub fn initial_conditions(&self, parameters: &[f64]) -> InitialConditions {
        let seed = parameters.last().copied().unwrap_or_default();
        [10f64.powf(seed), self.rescaling_by, 0.0, 0.0]
    }

    /// Solves the model for `parameters` up to the time horizon.
    pub fn solve(&self, parameters: &[f64]) -> Result<Trajectory> {
        self.check_dim(parameters)?;
        let initial = self.initial_conditions(parameters);
        self.model.solve(parameters, &initial, self.t_end)
    }

    /// Sum of squared residuals over the series selected by `fit`.
    pub fn chi_squared(&self, parameters: &[f64], fit: FitSeries) -> Result<f64> {
        let model = self.solve(parameters)?;
        chi_squared(&model, self.data(), fit, parameters)
    }

    /// `-0.5 * chi_squared`, an unnormalized log-likelihood.
    pub fn log_prob(&self, parameters: &[f64], fit: FitSeries) -> Result<f64> {
        Ok(-0.5 * self.chi_squared(parameters, fit)?)
    }

    /// The log-likelihood as a sampling target.
    pub fn likelihood(&self, fit: FitSeries) -> Likelihood<'_, M, D> {
        Likelihood {
            calibration: self,
            fit,
        }
    }

    /// Builds the sampler described by `options`, checking it against `ndim`.
    pub fn sampler(
        &self,
        options: &SamplingOptions,
    ) -> Result<MetropolisHastings<Likelihood<'_, M, D>, UniformStep>> {
        if options.par_stp.len() != self.ndim() {
            return Err(Error::DimensionMismatch {
                what: "step sizes",
                expected: self.ndim(),
                got: options.par_stp.len(),
            });
        }
        let proposal = UniformStep::new(options.par_stp.clone())?;
        let mh = MetropolisHastings::new(
            self.likelihood(options.fit),
            proposal,
            &self.par_est,
            options.n_walkers,
        )?;
        Ok(match options.seed {
            Some(seed) => mh.set_seed(seed),
            None => mh,
        })
    }

    /**
    Generates `options.n_points` samples and stores them in
    `options.file_name` inside `tables`.

    Everything that can be checked up front (dimensions, walker count, the
    log-likelihood of the starting point) is checked before the table is
    opened, so a misconfigured run leaves an existing table untouched.
    */
    pub fn metropolis_hastings(
        &self,
        options: &SamplingOptions,
        tables: &TablesDir,
    ) -> Result<RunSummary> {
        let mh = self.sampler(options)?;
        let start = mh.initial_log_prob()?;
        debug!(
            "sampling {} points with {} walkers from {:?} (log-probability {start})",
            options.n_points, options.n_walkers, self.par_est
        );

        let path = tables.path(&options.file_name);
        let mut writer = TsvSampleWriter::create(&path, &self.par_labels, options.overwrite)?;
        let summary = mh.run_from(start, options.n_points, &mut writer, options.progress)?;
        writer.finish()?;

        info!(
            "wrote {} samples to {} (acceptance rate {:.3})",
            summary.rows_written(),
            path.display(),
            summary.acceptance_rate()
        );
        Ok(summary)
    }
}

/// Log-likelihood of a [`Calibration`] for a fixed choice of fitted series.
#[derive(Debug)]
pub struct Likelihood<'a, M, D> {
    calibration: &'a Calibration<M, D>,
    fit: FitSeries,
}

impl<M, D> Clone for Likelihood<'_, M, D> {
    fn clone(&self) -> Self {
        Self {
            calibration: self.calibration,
            fit: self.fit,
        }
    }
}

impl<M, D> Target for Likelihood<'_, M, D>
where
    M: CompartmentalModel,
    D: Dataset,
{
    fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64> {
        self.calibration.log_prob(theta, self.fit)
    }
}

/// Settings of one sampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOptions {
    /// Total number of rows to generate, across all walkers.
    pub n_points: usize,
    /// Maximum displacement per parameter and step.
    pub par_stp: Vec<f64>,
    pub file_name: String,
    /// Truncate the table and write a header instead of appending.
    pub overwrite: bool,
    pub n_walkers: usize,
    pub fit: FitSeries,
    pub seed: Option<u64>,
    /// Show a progress bar per walker.
    pub progress: bool,
}

impl SamplingOptions {
    pub fn new(n_points: usize, par_stp: Vec<f64>) -> Self {
        Self {
            n_points,
            par_stp,
            file_name: "mcmc.csv".to_string(),
            overwrite: false,
            n_walkers: 1,
            fit: FitSeries::all(),
            seed: None,
            progress: false,
        }
    }

    pub fn file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn n_walkers(mut self, n_walkers: usize) -> Self {
        self.n_walkers = n_walkers;
        self
    }

    pub fn fit(mut self, fit: FitSeries) -> Self {
        self.fit = fit;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}
