//! TOML configuration of a calibration run.
//!
//! ```toml
//! [model]
//! par_est = [0.3, 0.1, 0.01, 4.0]
//! par_labels = ["beta", "gamma", "mu", "log10_s0"]
//!
//! [sampling]
//! n_points = 20000
//! n_walkers = 4
//! par_stp = [0.01, 0.005, 0.001, 0.05]
//! overwrite = true
//! seed = 42
//!
//! [sampling.fit]
//! recovered = false
//!
//! [analysis]
//! alpha = 0.3173
//! tables_dir = "tables"
//! ```

use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::calibration::{Calibration, SamplingOptions};
use crate::error::{Error, Result};
use crate::model::{CompartmentalModel, Dataset};
use crate::objective::FitSeries;
use crate::posterior::DEFAULT_ALPHA;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationConfig {
    pub model: ModelConfig,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Starting point of every walker; the last entry is the seed exponent.
    pub par_est: Vec<f64>,
    #[serde(default)]
    pub par_labels: Option<Vec<String>>,
    #[serde(default = "default_rescaling_by")]
    pub rescaling_by: f64,
    /// Defaults to the last observed day.
    #[serde(default)]
    pub t_end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    pub n_points: usize,
    #[serde(default = "default_n_walkers")]
    pub n_walkers: usize,
    pub par_stp: Vec<f64>,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub fit: FitSeries,
    #[serde(default = "default_progress")]
    pub progress: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_tables_dir")]
    pub tables_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            tables_dir: default_tables_dir(),
        }
    }
}

fn default_rescaling_by() -> f64 {
    1.0
}

fn default_n_walkers() -> usize {
    1
}

fn default_file_name() -> String {
    "mcmc.csv".to_string()
}

fn default_progress() -> bool {
    true
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_tables_dir() -> PathBuf {
    PathBuf::from("tables")
}

impl CalibrationConfig {
    /// Loads and validates the configuration file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!("loading calibration config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parses and validates a configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the constraints that span several fields.
    pub fn validate(&self) -> Result<()> {
        let ndim = self.model.par_est.len();
        if ndim == 0 {
            return Err(Error::InvalidConfig(
                "model.par_est must not be empty".to_string(),
            ));
        }
        if self.sampling.par_stp.len() != ndim {
            return Err(Error::DimensionMismatch {
                what: "sampling.par_stp",
                expected: ndim,
                got: self.sampling.par_stp.len(),
            });
        }
        if let Some(labels) = &self.model.par_labels {
            if labels.len() != ndim {
                return Err(Error::DimensionMismatch {
                    what: "model.par_labels",
                    expected: ndim,
                    got: labels.len(),
                });
            }
        }
        if self.sampling.n_walkers == 0 {
            return Err(Error::InvalidConfig(
                "sampling.n_walkers must be positive".to_string(),
            ));
        }
        if self.sampling.fit.compartments().next().is_none() {
            return Err(Error::InvalidConfig(
                "sampling.fit must enable at least one series".to_string(),
            ));
        }
        let alpha = self.analysis.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "analysis.alpha must lie in (0, 1), got {alpha}"
            )));
        }
        Ok(())
    }

    /// Builds the calibration of `model` against `data` described by `[model]`.
    pub fn calibration<M, D>(&self, data: D, model: M) -> Result<Calibration<M, D>>
    where
        M: CompartmentalModel,
        D: Dataset,
    {
        let mut calibration = Calibration::new(data, model, self.model.par_est.clone())?
            .with_rescaling(self.model.rescaling_by);
        if let Some(labels) = &self.model.par_labels {
            calibration = calibration.with_labels(labels.clone())?;
        }
        if let Some(t_end) = self.model.t_end {
            calibration = calibration.with_t_end(t_end)?;
        }
        Ok(calibration)
    }

    /// The `[sampling]` section as run options.
    pub fn sampling_options(&self) -> SamplingOptions {
        let sampling = &self.sampling;
        let options = SamplingOptions::new(sampling.n_points, sampling.par_stp.clone())
            .n_walkers(sampling.n_walkers)
            .file_name(sampling.file_name.clone())
            .overwrite(sampling.overwrite)
            .fit(sampling.fit)
            .progress(sampling.progress);
        match sampling.seed {
            Some(seed) => options.seed(seed),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [model]
        par_est = [0.3, 4.0]

        [sampling]
        n_points = 100
        par_stp = [0.01, 0.1]
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = CalibrationConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.model.rescaling_by, 1.0);
        assert_eq!(config.model.par_labels, None);
        assert_eq!(config.model.t_end, None);
        assert_eq!(config.sampling.n_walkers, 1);
        assert_eq!(config.sampling.file_name, "mcmc.csv");
        assert!(!config.sampling.overwrite);
        assert!(config.sampling.progress);
        assert_eq!(config.sampling.fit, FitSeries::all());
        assert_eq!(config.analysis.alpha, 0.3173);
        assert_eq!(config.analysis.tables_dir, PathBuf::from("tables"));

        let options = config.sampling_options();
        assert_eq!(options.n_points, 100);
        assert_eq!(options.seed, None);
    }

    #[test]
    fn full_config_round_trips_into_options() {
        let config = CalibrationConfig::from_toml_str(
            r#"
            [model]
            par_est = [0.3, 0.1, 0.01, 4.0]
            par_labels = ["beta", "gamma", "mu", "log10_s0"]
            rescaling_by = 10.0
            t_end = 60.0

            [sampling]
            n_points = 5000
            n_walkers = 4
            par_stp = [0.01, 0.005, 0.001, 0.05]
            file_name = "run.tsv"
            overwrite = true
            seed = 42
            progress = false

            [sampling.fit]
            recovered = false

            [analysis]
            alpha = 0.05
            tables_dir = "out"
            "#,
        )
        .unwrap();

        let options = config.sampling_options();
        assert_eq!(options.n_walkers, 4);
        assert_eq!(options.file_name, "run.tsv");
        assert!(options.overwrite);
        assert_eq!(options.seed, Some(42));
        assert!(!options.progress);
        assert!(options.fit.confirmed && !options.fit.recovered && options.fit.deaths);
        assert_eq!(config.analysis.tables_dir, PathBuf::from("out"));
    }

    #[test]
    fn mismatched_step_sizes_are_rejected() {
        let err = CalibrationConfig::from_toml_str(
            r#"
            [model]
            par_est = [0.3, 4.0]
            [sampling]
            n_points = 10
            par_stp = [0.01]
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                what: "sampling.par_stp",
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let with = |extra: &str| CalibrationConfig::from_toml_str(&format!("{MINIMAL}\n{extra}"));
        assert!(matches!(
            with("[analysis]\nalpha = 1.5"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            with("[sampling.fit]\nconfirmed = false\nrecovered = false\ndeaths = false"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_or_malformed_fields_are_parse_errors() {
        assert!(matches!(
            CalibrationConfig::from_toml_str("[model]\npar_est = \"x\""),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(
            CalibrationConfig::from_toml_str(&format!("{MINIMAL}\n[extra]\nkey = 1")),
            Err(Error::ConfigParse(_))
        ));
    }
}
