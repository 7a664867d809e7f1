use thiserror::Error;

/// Errors raised while configuring, sampling or analysing a calibration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{what} has length {got}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("no MCMC sample has been imported, call `import` first")]
    SampleNotImported,
    #[error("model produced a non-finite solution for parameters {parameters:?}")]
    NonFiniteSolution { parameters: Vec<f64> },
    #[error("invalid time series: {0}")]
    InvalidTimeSeries(String),
    #[error("solver failed: {0}")]
    Solver(String),
    #[error("walker {walker}, step {step}, parameters {parameters:?}: {source}")]
    Sampling {
        walker: usize,
        step: usize,
        parameters: Vec<f64>,
        #[source]
        source: Box<Error>,
    },
    #[error("could not parse {value:?} at line {line}, column {column}")]
    ParseValue {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("sample table {0:?} has no header row")]
    MissingHeader(std::path::PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Quantile(#[from] ndarray_stats::errors::QuantileError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    ConfigParse(#[from] toml::de::Error),
}

/// Convenience type for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
