/*!
# Model and dataset interfaces

A calibration needs two collaborators: a compartmental model that can be solved
for a parameter vector, and a set of observations to compare against. Both
speak in [`Trajectory`], four aligned columns (days, confirmed, recovered,
deaths). The model's days and the data's days need not coincide; the objective
interpolates the model onto the observation grid.
*/

use crate::error::{Error, Result};

/// Initial state handed to the solver: `[10^seed, rescaling, 0, 0]`.
pub type InitialConditions = [f64; 4];

/// The three observed series a calibration can be fitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compartment {
    Confirmed,
    Recovered,
    Deaths,
}

impl Compartment {
    pub const ALL: [Compartment; 3] = [
        Compartment::Confirmed,
        Compartment::Recovered,
        Compartment::Deaths,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Compartment::Confirmed => "confirmed",
            Compartment::Recovered => "recovered",
            Compartment::Deaths => "deaths",
        }
    }
}

/// A borrowed `(time, value)` pair of equal-length columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeries<'a> {
    pub time: &'a [f64],
    pub value: &'a [f64],
}

/// Aligned daily columns, produced either by a solver or by a dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    pub days: Vec<f64>,
    pub confirmed: Vec<f64>,
    pub recovered: Vec<f64>,
    pub deaths: Vec<f64>,
}

impl Trajectory {
    /// Builds a trajectory, checking that every column matches `days` in length.
    pub fn new(
        days: Vec<f64>,
        confirmed: Vec<f64>,
        recovered: Vec<f64>,
        deaths: Vec<f64>,
    ) -> Result<Self> {
        let trajectory = Self {
            days,
            confirmed,
            recovered,
            deaths,
        };
        trajectory.check_lengths()?;
        Ok(trajectory)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn values(&self, compartment: Compartment) -> &[f64] {
        match compartment {
            Compartment::Confirmed => &self.confirmed,
            Compartment::Recovered => &self.recovered,
            Compartment::Deaths => &self.deaths,
        }
    }

    pub fn series(&self, compartment: Compartment) -> TimeSeries<'_> {
        TimeSeries {
            time: &self.days,
            value: self.values(compartment),
        }
    }

    /// Last day on the time axis, if any.
    pub fn last_day(&self) -> Option<f64> {
        self.days.last().copied()
    }

    /// `true` when every entry of every column is finite.
    pub fn is_finite(&self) -> bool {
        self.days
            .iter()
            .chain(&self.confirmed)
            .chain(&self.recovered)
            .chain(&self.deaths)
            .all(|v| v.is_finite())
    }

    pub(crate) fn check_lengths(&self) -> Result<()> {
        let n = self.days.len();
        for compartment in Compartment::ALL {
            let len = self.values(compartment).len();
            if len != n {
                return Err(Error::InvalidTimeSeries(format!(
                    "{} column has {} values but there are {} days",
                    compartment.name(),
                    len,
                    n
                )));
            }
        }
        Ok(())
    }

    /// Rejects NaN or infinite days and observations, naming the first offender.
    pub(crate) fn check_finite(&self) -> Result<()> {
        let columns = std::iter::once(("days", &self.days[..])).chain(
            Compartment::ALL
                .into_iter()
                .map(|c| (c.name(), self.values(c))),
        );
        for (name, column) in columns {
            if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                return Err(Error::InvalidTimeSeries(format!(
                    "{name} column has a non-finite value {} at row {row}",
                    column[row]
                )));
            }
        }
        Ok(())
    }
}

/// A compartmental model that can be integrated up to `t_end`.
///
/// Implementations receive the full parameter vector, including the trailing
/// seed exponent, and the initial conditions derived from it.
pub trait CompartmentalModel {
    fn solve(
        &self,
        parameters: &[f64],
        initial: &InitialConditions,
        t_end: f64,
    ) -> Result<Trajectory>;
}

impl<M: CompartmentalModel + ?Sized> CompartmentalModel for &M {
    fn solve(
        &self,
        parameters: &[f64],
        initial: &InitialConditions,
        t_end: f64,
    ) -> Result<Trajectory> {
        (**self).solve(parameters, initial, t_end)
    }
}

/// Observed data for a single geography.
pub trait Dataset {
    fn observations(&self) -> &Trajectory;

    /// Time horizon used when the caller does not supply one.
    fn t_end(&self) -> Option<f64> {
        self.observations().last_day()
    }
}

impl Dataset for Trajectory {
    fn observations(&self) -> &Trajectory {
        self
    }
}
