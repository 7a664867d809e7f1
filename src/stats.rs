//! Provides functions for computing MCMC sample statistics.

use ndarray::prelude::*;
use ndarray_stats::interpolate::Linear;
use ndarray_stats::QuantileExt;
use noisy_float::types::n64;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Counts accepted and proposed moves of a single walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptanceTracker {
    n: u64,
    n_accepted: u64,
}

impl AcceptanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, accepted: bool) {
        self.n += 1;
        if accepted {
            self.n_accepted += 1;
        }
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn n_accepted(&self) -> u64 {
        self.n_accepted
    }

    /// Fraction of accepted proposals, `0.0` before the first step.
    pub fn acceptance_rate(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.n_accepted as f64 / self.n as f64
        }
    }
}

/// Per-column mean and population standard deviation.
pub fn column_moments(values: ArrayView2<f64>) -> Vec<(f64, f64)> {
    let n = values.nrows() as f64;
    (0..values.ncols())
        .into_par_iter()
        .map(|j| {
            let column = values.column(j);
            if column.is_empty() {
                return (f64::NAN, f64::NAN);
            }
            let mean = column.sum() / n;
            let var = column.fold(0.0, |acc, x| acc + (x - mean) * (x - mean)) / n;
            (mean, var.sqrt())
        })
        .collect()
}

/// Marks the rows whose z-score is below `threshold` in every column.
///
/// Z-scores use the population standard deviation. A column with zero spread
/// has z = 0 everywhere and never rejects a row. Rows containing NaN are
/// rejected.
pub fn zscore_mask(values: ArrayView2<f64>, threshold: f64) -> Array1<bool> {
    let moments = column_moments(values);
    values
        .outer_iter()
        .map(|row| {
            row.iter().zip(&moments).all(|(&x, &(mean, std))| {
                let z = if std > 0.0 { (x - mean) / std } else { x - mean };
                z.abs() < threshold
            })
        })
        .collect()
}

/// Keeps the rows selected by `mask`.
pub fn select_rows(values: ArrayView2<f64>, mask: &Array1<bool>) -> Array2<f64> {
    let keep: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect();
    values.select(Axis(0), &keep)
}

/// Percentiles of every column, on the 0–100 scale, with linear interpolation
/// between order statistics (the `numpy.percentile` default).
///
/// Returns an array of shape `(n_columns, percentiles.len())`.
pub fn column_percentiles(values: ArrayView2<f64>, percentiles: &[f64]) -> Result<Array2<f64>> {
    let rows: Vec<Vec<f64>> = (0..values.ncols())
        .into_par_iter()
        .map(|j| {
            let mut column = values.column(j).to_owned();
            percentiles
                .iter()
                .map(|&p| {
                    let q = column.quantile_axis_skipnan_mut(Axis(0), n64(p / 100.0), &Linear)?;
                    Ok::<f64, Error>(q.into_scalar())
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec(
        (values.ncols(), percentiles.len()),
        flat,
    )?)
}
