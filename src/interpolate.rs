//! One-dimensional piecewise-linear interpolation.
//!
//! Query points outside `[xp[0], xp[n-1]]` take the nearest boundary value, the
//! same convention as `numpy.interp`. The model trajectory is never
//! extrapolated, so observations recorded past the end of the solution are
//! compared against the last solved value.

use num_traits::Float;

use crate::error::{Error, Result};

/// A validated interpolation table borrowing its knots.
#[derive(Debug, Clone, Copy)]
pub struct LinearInterpolator<'a, T> {
    xp: &'a [T],
    fp: &'a [T],
}

impl<'a, T: Float> LinearInterpolator<'a, T> {
    /// Builds an interpolator over the knots `(xp[i], fp[i])`.
    ///
    /// `xp` must be non-empty, non-decreasing and free of NaN, and `fp` must
    /// have the same length.
    pub fn new(xp: &'a [T], fp: &'a [T]) -> Result<Self> {
        if xp.is_empty() {
            return Err(Error::InvalidTimeSeries(
                "cannot interpolate over an empty time axis".to_string(),
            ));
        }
        if xp.len() != fp.len() {
            return Err(Error::InvalidTimeSeries(format!(
                "time axis has {} points but values have {}",
                xp.len(),
                fp.len()
            )));
        }
        if xp.iter().any(|x| x.is_nan()) {
            return Err(Error::InvalidTimeSeries(
                "time axis contains NaN".to_string(),
            ));
        }
        if xp.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::InvalidTimeSeries(
                "time axis must be non-decreasing".to_string(),
            ));
        }
        Ok(Self { xp, fp })
    }

    /// Evaluates the interpolant at `x`, clamping outside the knot range.
    pub fn at(&self, x: T) -> Result<T> {
        if x.is_nan() {
            return Err(Error::InvalidTimeSeries(
                "cannot interpolate at NaN".to_string(),
            ));
        }
        let last = self.xp.len() - 1;
        if x <= self.xp[0] {
            return Ok(self.fp[0]);
        }
        if x >= self.xp[last] {
            return Ok(self.fp[last]);
        }

        // xp[0] < x < xp[last], so 1 <= hi <= last and xp[hi - 1] <= x < xp[hi].
        let hi = self.xp.partition_point(|&v| v <= x);
        let lo = hi - 1;
        let t = (x - self.xp[lo]) / (self.xp[hi] - self.xp[lo]);
        Ok(self.fp[lo] + t * (self.fp[hi] - self.fp[lo]))
    }

    /// Evaluates the interpolant at every point of `x`.
    pub fn eval(&self, x: &[T]) -> Result<Vec<T>> {
        x.iter().map(|&xi| self.at(xi)).collect()
    }
}

/// Interpolates `(xp, fp)` onto the points `x`.
pub fn interp<T: Float>(x: &[T], xp: &[T], fp: &[T]) -> Result<Vec<T>> {
    LinearInterpolator::new(xp, fp)?.eval(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn interpolates_between_knots() {
        let y = interp(&[0.5, 1.25, 2.0], &[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0]).unwrap();
        assert_abs_diff_eq!(y[0], 5.0);
        assert_abs_diff_eq!(y[1], 15.0);
        assert_abs_diff_eq!(y[2], 30.0);
    }

    #[test]
    fn clamps_outside_range() {
        let y = interp(&[-3.0, 0.0, 7.0, 1e9], &[0.0, 1.0, 2.0], &[4.0, 5.0, 9.0]).unwrap();
        assert_eq!(y, vec![4.0, 4.0, 9.0, 9.0]);
    }

    #[test]
    fn single_knot_is_constant() {
        let y = interp(&[-1.0, 0.0, 1.0], &[0.0], &[3.5]).unwrap();
        assert_eq!(y, vec![3.5, 3.5, 3.5]);
    }

    #[test]
    fn repeated_knot_does_not_divide_by_zero() {
        let y = interp(&[1.0, 1.5], &[0.0, 1.0, 1.0, 2.0], &[0.0, 1.0, 3.0, 5.0]).unwrap();
        assert!(y.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(y[1], 4.0);
    }

    #[test]
    fn works_with_f32() {
        let y = interp(&[0.5f32], &[0.0f32, 1.0], &[0.0f32, 2.0]).unwrap();
        assert_abs_diff_eq!(y[0], 1.0f32);
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(matches!(
            interp::<f64>(&[0.0], &[], &[]),
            Err(Error::InvalidTimeSeries(_))
        ));
        assert!(matches!(
            interp(&[0.0], &[0.0, 1.0], &[1.0]),
            Err(Error::InvalidTimeSeries(_))
        ));
        assert!(matches!(
            interp(&[0.0], &[1.0, 0.0], &[1.0, 2.0]),
            Err(Error::InvalidTimeSeries(_))
        ));
        assert!(matches!(
            interp(&[f64::NAN], &[0.0, 1.0], &[1.0, 2.0]),
            Err(Error::InvalidTimeSeries(_))
        ));
    }
}
