//! End-to-end tests of a calibration run: sampling into a table on disk, reading
//! it back and estimating credible intervals.

use epi_mcmc::calibration::{Calibration, SamplingOptions};
use epi_mcmc::io::TablesDir;
use epi_mcmc::model::{CompartmentalModel, InitialConditions, Trajectory};
use epi_mcmc::objective::FitSeries;
use epi_mcmc::posterior::{PosteriorAnalyzer, DEFAULT_ALPHA};
use epi_mcmc::{Error, Result};

/// `confirmed(t) = slope * t` on integer days, nothing else.
struct Line;

impl CompartmentalModel for Line {
    fn solve(&self, p: &[f64], _initial: &InitialConditions, t_end: f64) -> Result<Trajectory> {
        let days: Vec<f64> = (0..=t_end.ceil() as usize).map(|d| d as f64).collect();
        let confirmed = days.iter().map(|t| p[0] * t).collect();
        let zeros = vec![0.0; days.len()];
        Trajectory::new(days, confirmed, zeros.clone(), zeros)
    }
}

/// Like [`Line`], but diverges once the slope exceeds `limit`.
struct Unstable {
    limit: f64,
}

impl CompartmentalModel for Unstable {
    fn solve(&self, p: &[f64], initial: &InitialConditions, t_end: f64) -> Result<Trajectory> {
        let mut trajectory = Line.solve(p, initial, t_end)?;
        if p[0] > self.limit {
            trajectory.confirmed[1] = f64::NAN;
        }
        Ok(trajectory)
    }
}

fn line_data() -> Trajectory {
    Trajectory::new(
        vec![0.0, 1.0, 2.0, 3.0],
        vec![0.0, 1.0, 2.0, 3.0],
        vec![0.0; 4],
        vec![0.0; 4],
    )
    .unwrap()
}

fn count_lines(path: &std::path::Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_series_have_zero_chi_squared() {
        let calibration = Calibration::new(line_data(), Line, vec![1.0, 0.0]).unwrap();
        let fit = FitSeries::confirmed_only();
        assert_eq!(calibration.chi_squared(&[1.0, 0.0], fit).unwrap(), 0.0);
        assert_eq!(calibration.log_prob(&[1.0, 0.0], fit).unwrap(), 0.0);
        // slope 2 misses by t at every day: 0 + 1 + 4 + 9
        assert_eq!(calibration.chi_squared(&[2.0, 0.0], fit).unwrap(), 14.0);
    }

    #[test]
    fn overwrite_writes_header_and_every_point() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path().join("tables")).unwrap();
        let calibration = Calibration::new(line_data(), Line, vec![1.0, 0.0])
            .unwrap()
            .with_labels(vec!["slope".to_string(), "seed".to_string()])
            .unwrap();

        let options = SamplingOptions::new(101, vec![0.1, 0.0])
            .n_walkers(3)
            .overwrite(true)
            .seed(5)
            .fit(FitSeries::confirmed_only());
        let summary = calibration.metropolis_hastings(&options, &tables).unwrap();
        assert_eq!(summary.rows_written(), 101);
        assert_eq!(summary.walkers.len(), 3);

        let path = tables.path("mcmc.csv");
        assert_eq!(count_lines(&path), 102);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("slope\tseed\n"));
        // a zero step size freezes the seed exponent
        assert!(contents.lines().skip(1).all(|l| l.ends_with("\t0")));
    }

    #[test]
    fn append_keeps_previous_rows_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path()).unwrap();
        let calibration = Calibration::new(line_data(), Line, vec![1.0, 0.0]).unwrap();
        let options = SamplingOptions::new(40, vec![0.1, 0.0])
            .file_name("chain.tsv")
            .fit(FitSeries::confirmed_only())
            .seed(1);

        calibration
            .metropolis_hastings(&options.clone().overwrite(true), &tables)
            .unwrap();
        calibration
            .metropolis_hastings(&options.clone().n_walkers(2).seed(2), &tables)
            .unwrap();

        let path = tables.path("chain.tsv");
        assert_eq!(count_lines(&path), 1 + 40 + 40);

        let mut analyzer = PosteriorAnalyzer::new();
        analyzer.import(&path).unwrap();
        assert_eq!(analyzer.raw_sample().unwrap().nrows(), 80);
    }

    #[test]
    fn fixed_seed_reproduces_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path()).unwrap();
        let calibration = Calibration::new(line_data(), Line, vec![0.5, 1.0]).unwrap();

        let run = |name: &str| {
            let options = SamplingOptions::new(500, vec![0.05, 0.1])
                .file_name(name)
                .n_walkers(4)
                .overwrite(true)
                .seed(1234);
            calibration.metropolis_hastings(&options, &tables).unwrap();
            std::fs::read(tables.path(name)).unwrap()
        };
        assert_eq!(run("a.csv"), run("b.csv"));
    }

    #[test]
    fn progress_bars_do_not_change_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path()).unwrap();
        let calibration = Calibration::new(line_data(), Line, vec![1.0, 0.0]).unwrap();

        let run = |name: &str, progress: bool| {
            let options = SamplingOptions::new(50, vec![0.1, 0.0])
                .file_name(name)
                .n_walkers(2)
                .overwrite(true)
                .seed(21)
                .progress(progress);
            let summary = calibration.metropolis_hastings(&options, &tables).unwrap();
            assert_eq!(summary.rows_written(), 50);
            assert_eq!(summary.walkers.len(), 2);
            assert_eq!(count_lines(&tables.path(name)), 51);
            std::fs::read(tables.path(name)).unwrap()
        };
        assert_eq!(run("with_bars.csv", true), run("quiet.csv", false));
    }

    #[test]
    fn non_finite_observations_are_rejected_up_front() {
        let mut data = line_data();
        data.recovered[3] = f64::NAN;
        assert!(matches!(
            Calibration::new(data, Line, vec![1.0, 0.0]),
            Err(Error::InvalidTimeSeries(_))
        ));
    }

    #[test]
    fn diverging_solver_aborts_with_walker_and_step() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path()).unwrap();
        let calibration =
            Calibration::new(line_data(), Unstable { limit: 1.2 }, vec![1.0, 0.0]).unwrap();

        assert!(matches!(
            calibration.chi_squared(&[1.5, 0.0], FitSeries::all()),
            Err(Error::NonFiniteSolution { .. })
        ));

        let options = SamplingOptions::new(10_000, vec![0.5, 0.0])
            .overwrite(true)
            .seed(3);
        match calibration.metropolis_hastings(&options, &tables).unwrap_err() {
            Error::Sampling {
                walker,
                step,
                parameters,
                source,
            } => {
                assert_eq!(walker, 1);
                assert!(step < 10_000);
                assert_eq!(parameters.len(), 2);
                assert!(matches!(*source, Error::NonFiniteSolution { .. }));
                // the rows before the failing step were persisted
                assert_eq!(count_lines(&tables.path("mcmc.csv")), 1 + step);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn invalid_start_leaves_existing_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path()).unwrap();
        std::fs::write(tables.path("mcmc.csv"), "keep\tme\n1\t2\n").unwrap();

        let calibration =
            Calibration::new(line_data(), Unstable { limit: 1.2 }, vec![2.0, 0.0]).unwrap();
        let options = SamplingOptions::new(10, vec![0.1, 0.0]).overwrite(true);
        assert!(matches!(
            calibration.metropolis_hastings(&options, &tables),
            Err(Error::NonFiniteSolution { .. })
        ));
        assert!(matches!(
            calibration.metropolis_hastings(&options.clone().n_walkers(0), &tables),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(
            std::fs::read_to_string(tables.path("mcmc.csv")).unwrap(),
            "keep\tme\n1\t2\n"
        );
    }

    #[test]
    fn estimates_bracket_the_true_slope() {
        let dir = tempfile::tempdir().unwrap();
        let tables = TablesDir::open(dir.path()).unwrap();
        let calibration = Calibration::new(line_data(), Line, vec![0.8, 0.0]).unwrap();
        let options = SamplingOptions::new(20_000, vec![0.2, 0.0])
            .n_walkers(2)
            .overwrite(true)
            .seed(99)
            .fit(FitSeries::confirmed_only());
        calibration.metropolis_hastings(&options, &tables).unwrap();

        let mut analyzer = PosteriorAnalyzer::new();
        assert!(matches!(
            analyzer.single_parameter_estimates(DEFAULT_ALPHA),
            Err(Error::SampleNotImported)
        ));
        analyzer.import(tables.path("mcmc.csv")).unwrap();
        assert_eq!(analyzer.labels().unwrap(), &["p1", "p2"]);

        for alpha in [0.05, DEFAULT_ALPHA, 0.5] {
            let estimates = analyzer.single_parameter_estimates(alpha).unwrap();
            assert_eq!(estimates.shape(), &[2, 3]);
            for row in estimates.outer_iter() {
                assert!(row[0] <= row[1] && row[1] <= row[2]);
            }
        }

        // log-likelihood -7 (slope - 1)^2, so sigma = 1 / sqrt(14)
        let one_sigma = analyzer.single_parameter_estimates(DEFAULT_ALPHA).unwrap();
        assert!(one_sigma[[0, 0]] < 1.0 && 1.0 < one_sigma[[0, 2]]);
        assert!((one_sigma[[0, 1]] - 1.0).abs() < 0.1);
        assert!(one_sigma[[0, 2]] - one_sigma[[0, 0]] < 1.0);
    }
}
