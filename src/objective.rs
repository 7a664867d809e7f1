//! Sum-of-squared-residuals objective between a solved model and observations.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::interpolate::LinearInterpolator;
use crate::model::{Compartment, Trajectory};

/// Which observed series contribute to the chi-squared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FitSeries {
    pub confirmed: bool,
    pub recovered: bool,
    pub deaths: bool,
}

impl Default for FitSeries {
    fn default() -> Self {
        Self::all()
    }
}

impl FitSeries {
    pub fn all() -> Self {
        Self {
            confirmed: true,
            recovered: true,
            deaths: true,
        }
    }

    pub fn confirmed_only() -> Self {
        Self {
            confirmed: true,
            recovered: false,
            deaths: false,
        }
    }

    pub fn includes(&self, compartment: Compartment) -> bool {
        match compartment {
            Compartment::Confirmed => self.confirmed,
            Compartment::Recovered => self.recovered,
            Compartment::Deaths => self.deaths,
        }
    }

    /// Enabled compartments, in confirmed/recovered/deaths order.
    pub fn compartments(&self) -> impl Iterator<Item = Compartment> + '_ {
        Compartment::ALL
            .into_iter()
            .filter(move |c| self.includes(*c))
    }
}

/// `Σ (model(t_i) - observed_i)^2` over one compartment, with the model
/// interpolated onto the observed days.
pub fn series_chi_squared(
    model: &Trajectory,
    data: &Trajectory,
    compartment: Compartment,
) -> Result<f64> {
    let interpolator = LinearInterpolator::new(&model.days, model.values(compartment))?;
    data.days
        .iter()
        .zip(data.values(compartment))
        .try_fold(0.0, |acc, (&t, &observed)| {
            let residual = interpolator.at(t)? - observed;
            Ok::<f64, Error>(acc + residual * residual)
        })
}

/// Total chi-squared across the enabled compartments.
///
/// Returns [`Error::NonFiniteSolution`] if the model contains non-finite
/// values or the sum overflows, so that NaN never reaches an acceptance test.
pub fn chi_squared(
    model: &Trajectory,
    data: &Trajectory,
    fit: FitSeries,
    parameters: &[f64],
) -> Result<f64> {
    model.check_lengths()?;
    if !model.is_finite() {
        return Err(Error::NonFiniteSolution {
            parameters: parameters.to_vec(),
        });
    }

    let mut total = 0.0;
    for compartment in fit.compartments() {
        total += series_chi_squared(model, data, compartment)?;
    }

    if !total.is_finite() {
        return Err(Error::NonFiniteSolution {
            parameters: parameters.to_vec(),
        });
    }
    Ok(total)
}
