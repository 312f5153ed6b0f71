pub mod cash_flow;
pub mod config;
pub mod cost_model;
pub mod error;
pub mod evaluation;
pub mod time_value;
pub mod types;
pub mod units;
pub mod valuation;
pub mod viability;

#[cfg(feature = "sensitivity")]
pub mod scenarios;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "resource")]
pub mod resource;

pub use config::EngineConfig;
pub use error::ViabilityError;
pub use types::*;

/// Standard result type for all viability engine operations
pub type ViabilityResult<T> = Result<T, ViabilityError>;
