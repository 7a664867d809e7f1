/*!
# Posterior analysis

[`PosteriorAnalyzer`] loads a sample table written by a calibration run and
computes per-parameter credible intervals.

On import every row is screened with a z-score test (population standard
deviation, threshold [`OUTLIER_THRESHOLD`]): a row survives only if it is within
the threshold in every column. The surviving rows form the filtered sample,
which is what plots should show. Interval estimates are computed on the raw
sample.

```rust
use epi_mcmc::io::{SampleSink, TsvSampleWriter};
use epi_mcmc::posterior::PosteriorAnalyzer;

let dir = tempfile::tempdir()?;
let path = dir.path().join("mcmc.csv");
let mut writer = TsvSampleWriter::create(&path, &["a".to_string()], true)?;
for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
    writer.write_sample(&[v])?;
}
writer.finish()?;

let mut analyzer = PosteriorAnalyzer::new();
analyzer.import(&path)?;
let estimates = analyzer.single_parameter_estimates(0.5)?;
assert_eq!(estimates.row(0).to_vec(), vec![2.0, 3.0, 4.0]);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

use std::path::Path;

use log::{debug, warn};
use ndarray::{Array1, Array2};

use crate::error::{Error, Result};
use crate::io::read_samples;
use crate::stats::{column_percentiles, select_rows, zscore_mask};

/// Rows with `|z| >= OUTLIER_THRESHOLD` in any column are filtered out.
pub const OUTLIER_THRESHOLD: f64 = 3.1;

/// Default significance level, the mass outside a one-sigma interval.
pub const DEFAULT_ALPHA: f64 = 0.3173;

/// A sample table held in memory together with its outlier screening.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSample {
    pub labels: Vec<String>,
    pub raw: Array2<f64>,
    pub filtered: Array2<f64>,
    /// `true` for the rows of `raw` kept in `filtered`.
    pub mask: Array1<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PosteriorAnalyzer {
    sample: Option<ImportedSample>,
}

impl PosteriorAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the table at `path`, replacing any previously imported sample.
    pub fn import<P: AsRef<Path>>(&mut self, path: P) -> Result<&ImportedSample> {
        let path = path.as_ref();
        let table = read_samples(path)?;
        let mask = zscore_mask(table.values.view(), OUTLIER_THRESHOLD);
        let filtered = select_rows(table.values.view(), &mask);

        let n_raw = table.values.nrows();
        let n_kept = filtered.nrows();
        debug!(
            "imported {} rows from {}, {} kept after outlier screening",
            n_raw,
            path.display(),
            n_kept
        );
        if n_raw > 0 && 2 * n_kept < n_raw {
            warn!(
                "outlier screening removed {} of {} rows of {}",
                n_raw - n_kept,
                n_raw,
                path.display()
            );
        }

        Ok(&*self.sample.insert(ImportedSample {
            labels: table.labels,
            raw: table.values,
            filtered,
            mask,
        }))
    }

    pub fn is_imported(&self) -> bool {
        self.sample.is_some()
    }

    pub fn sample(&self) -> Result<&ImportedSample> {
        self.sample.as_ref().ok_or(Error::SampleNotImported)
    }

    pub fn labels(&self) -> Result<&[String]> {
        Ok(&self.sample()?.labels)
    }

    pub fn raw_sample(&self) -> Result<&Array2<f64>> {
        Ok(&self.sample()?.raw)
    }

    pub fn filtered_sample(&self) -> Result<&Array2<f64>> {
        Ok(&self.sample()?.filtered)
    }

    /**
    Lower bound, median and upper bound of every parameter.

    Row `i` of the result holds the percentiles `100·alpha/2`, `50` and
    `100 − 100·alpha/2` of column `i` of the raw sample. `alpha` must lie in
    `(0, 1)`; see [`DEFAULT_ALPHA`].
    */
    pub fn single_parameter_estimates(&self, alpha: f64) -> Result<Array2<f64>> {
        let sample = self.sample()?;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must lie in (0, 1), got {alpha}"
            )));
        }
        let tail = 100.0 * alpha / 2.0;
        column_percentiles(sample.raw.view(), &[tail, 50.0, 100.0 - tail])
    }
}
