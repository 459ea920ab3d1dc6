pub mod demand;
pub mod error;
pub mod estimator;
pub mod grid;
pub mod map;
pub mod report;
pub mod visualization;

pub use error::{EstimatorError, Result};
pub use estimator::CongestionEstimator;
pub use grid::{BinRecord, DemandField, Method};
pub use map::CongestionMap;
