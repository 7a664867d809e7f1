//! Metropolis–Hastings calibration of compartmental epidemic models against
//! confirmed, recovered and death time series.
//!
//! A [`calibration::Calibration`] pairs a [`model::CompartmentalModel`] with a
//! [`model::Dataset`], streams samples into a tab-separated table, and
//! [`posterior::PosteriorAnalyzer`] turns that table into credible intervals.

pub mod calibration;
pub mod config;
pub mod core;
pub mod distributions;
pub mod error;
pub mod interpolate;
pub mod io;
pub mod metropolis_hastings;
pub mod model;
pub mod models;
pub mod objective;
#[cfg(feature = "plot")]
pub mod plot;
pub mod posterior;
pub mod stats;

pub use error::{Error, Result};
