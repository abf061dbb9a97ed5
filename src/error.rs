use thiserror::Error;

/// Problems with a parameter set. All of them are detected before a
/// population is constructed, and all of them are fatal to the run.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {parameter} parameter '{value}', expected one of: {choices}")]
    UnknownChoice {
        parameter: &'static str,
        value: String,
        choices: String,
    },
    #[error("invalid allele configuration '{0}', expected six numbers")]
    MalformedAlleles(String),
    #[error("parameter {parameter} = {value} is out of range ({range})")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
        range: &'static str,
    },
    #[error("cannot construct {0} distribution")]
    Distribution(&'static str),
}

/// Failures of the collaborators that consume snapshots.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("cannot write result file: {0}")]
    Io(#[from] std::io::Error),
}
