pub mod breakdown;
pub mod estimator;
pub mod tables;
