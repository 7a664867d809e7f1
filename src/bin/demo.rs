//! Calibrates the SIRD model against synthetic noisy data, then prints the
//! credible interval of every parameter.
//!
//! ```text
//! cargo run --release --bin demo [config.toml]
//! ```

use epi_mcmc::config::CalibrationConfig;
use epi_mcmc::interpolate::interp;
use epi_mcmc::io::TablesDir;
use epi_mcmc::model::{CompartmentalModel, Trajectory};
use epi_mcmc::models::Sird;
use epi_mcmc::posterior::PosteriorAnalyzer;

use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::error::Error;

const TRUTH: [f64; 4] = [0.35, 0.1, 0.01, 4.0];
const RESCALING_BY: f64 = 10.0;
const N_DAYS: usize = 60;
const NOISE: f64 = 0.02;
const SEED: u64 = 42;

const DEFAULT_CONFIG: &str = r#"
[model]
par_est = [0.3, 0.12, 0.012, 3.9]
par_labels = ["beta", "gamma", "mu", "log10_s0"]
rescaling_by = 10.0

[sampling]
n_points = 20000
n_walkers = 4
par_stp = [0.002, 0.001, 0.0002, 0.005]
file_name = "sird_demo.csv"
overwrite = true
seed = 42

[analysis]
alpha = 0.3173
tables_dir = "tables"
"#;

/// Solves the model at `TRUTH`, resamples it daily and adds multiplicative
/// Gaussian noise.
fn synthetic_data(model: &Sird) -> Result<Trajectory, Box<dyn Error>> {
    let initial = [10f64.powf(TRUTH[3]), RESCALING_BY, 0.0, 0.0];
    let solution = model.solve(&TRUTH, &initial, N_DAYS as f64)?;

    let days: Vec<f64> = (0..=N_DAYS).map(|d| d as f64).collect();
    let mut rng = SmallRng::seed_from_u64(SEED);
    let noise = Normal::new(1.0, NOISE)?;
    let mut noisy = |values: &[f64]| -> Result<Vec<f64>, Box<dyn Error>> {
        Ok(interp(&days, &solution.days, values)?
            .into_iter()
            .map(|v| v * noise.sample(&mut rng))
            .collect())
    };

    let confirmed = noisy(&solution.confirmed)?;
    let recovered = noisy(&solution.recovered)?;
    let deaths = noisy(&solution.deaths)?;
    Ok(Trajectory::new(days, confirmed, recovered, deaths)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => CalibrationConfig::from_path(path)?,
        None => CalibrationConfig::from_toml_str(DEFAULT_CONFIG)?,
    };

    let model = Sird::new();
    let data = synthetic_data(&model)?;
    info!("generated {} days of synthetic data", data.len());

    let calibration = config.calibration(data, model)?;
    let tables = TablesDir::open(&config.analysis.tables_dir)?;
    let summary = calibration.metropolis_hastings(&config.sampling_options(), &tables)?;
    println!(
        "Generated {} samples, acceptance rate {:.3}",
        summary.rows_written(),
        summary.acceptance_rate()
    );

    let mut analyzer = PosteriorAnalyzer::new();
    analyzer.import(tables.path(&config.sampling.file_name))?;
    let estimates = analyzer.single_parameter_estimates(config.analysis.alpha)?;

    println!("{:>10} {:>12} {:>12} {:>12} {:>12}", "", "truth", "lower", "median", "upper");
    for (i, label) in analyzer.labels()?.iter().enumerate() {
        let truth = TRUTH.get(i).copied().unwrap_or(f64::NAN);
        println!(
            "{:>10} {:>12.5} {:>12.5} {:>12.5} {:>12.5}",
            label,
            truth,
            estimates[[i, 0]],
            estimates[[i, 1]],
            estimates[[i, 2]]
        );
    }

    #[cfg(feature = "plot")]
    {
        let median = estimates.column(1).to_vec();
        let best = calibration.solve(&median)?;
        epi_mcmc::plot::data_model_plot(&best, calibration.data(), tables.path("fit.html"))?;
        epi_mcmc::plot::corner_plot(
            analyzer.filtered_sample()?.view(),
            analyzer.labels()?,
            Some(&TRUTH[..]),
            tables.path("corner.html"),
        )?;
    }

    Ok(())
}
