//! Reference compartmental models.

use ode_solvers::{Rk4, System, Vector4};

use crate::error::{Error, Result};
use crate::model::{CompartmentalModel, InitialConditions, Trajectory};

type SirdState = Vector4<f64>;

/**
Susceptible, infected, recovered and dead compartments with constant total
population `N = S + I + R + D`:

```text
dS/dt = -beta S I / N
dI/dt =  beta S I / N - (gamma + mu) I
dR/dt =  gamma I
dD/dt =  mu I
```

Parameters are `[beta, gamma, mu, log10_s0]`; the last one only enters through
the initial conditions. The reported series are the cumulative confirmed cases
`I + R + D`, the recovered `R` and the deaths `D`, on the integrator's own time
grid.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sird {
    step: f64,
}

impl Default for Sird {
    fn default() -> Self {
        Self { step: 0.1 }
    }
}

impl Sird {
    pub const N_PARAMETERS: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fixed RK4 step, in days.
    pub fn with_step(step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "integration step must be positive, got {step}"
            )));
        }
        Ok(Self { step })
    }

    pub fn labels() -> Vec<String> {
        ["beta", "gamma", "mu", "log10_s0"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

struct SirdRates {
    beta: f64,
    gamma: f64,
    mu: f64,
}

impl System<f64, SirdState> for SirdRates {
    fn system(&self, _t: f64, y: &SirdState, dy: &mut SirdState) {
        let (s, i) = (y[0], y[1]);
        let n = y.sum();
        let infections = if n > 0.0 { self.beta * s * i / n } else { 0.0 };
        dy[0] = -infections;
        dy[1] = infections - (self.gamma + self.mu) * i;
        dy[2] = self.gamma * i;
        dy[3] = self.mu * i;
    }
}

impl CompartmentalModel for Sird {
    fn solve(
        &self,
        parameters: &[f64],
        initial: &InitialConditions,
        t_end: f64,
    ) -> Result<Trajectory> {
        if parameters.len() != Self::N_PARAMETERS {
            return Err(Error::DimensionMismatch {
                what: "SIRD parameters",
                expected: Self::N_PARAMETERS,
                got: parameters.len(),
            });
        }
        if !(t_end.is_finite() && t_end > 0.0) {
            return Err(Error::Solver(format!(
                "time horizon must be positive, got {t_end}"
            )));
        }

        let rates = SirdRates {
            beta: parameters[0],
            gamma: parameters[1],
            mu: parameters[2],
        };
        let y0 = SirdState::new(initial[0], initial[1], initial[2], initial[3]);
        let mut stepper = Rk4::new(rates, 0.0, y0, t_end, self.step);
        stepper
            .integrate()
            .map_err(|e| Error::Solver(format!("{e:?}")))?;

        let (days, states) = stepper.results().get();
        let confirmed = states.iter().map(|y| y[1] + y[2] + y[3]).collect();
        let recovered = states.iter().map(|y| y[2]).collect();
        let deaths = states.iter().map(|y| y[3]).collect();
        Trajectory::new(days.clone(), confirmed, recovered, deaths)
    }
}
