use thiserror::Error;

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[derive(Debug, Error, PartialEq)]
pub enum EstimatorError {
    #[error("invalid estimator configuration: {0}")]
    InvalidConfig(String),

    #[error("die area {width} x {height} cannot be gridded")]
    EmptyDesign { width: f64, height: f64 },

    #[error("demand grid is not initialized; call initialize() before running '{0}'")]
    GridNotInitialized(&'static str),
}
