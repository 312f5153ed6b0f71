use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViabilityError {
    #[error("Invalid project spec: {field} — {reason}")]
    InvalidProjectSpec { field: String, reason: String },

    #[error("Invalid financial assumptions: {field} — {reason}")]
    InvalidAssumptions { field: String, reason: String },

    #[error("Invalid engine configuration: {field} — {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Undefined metric: {metric} — {reason}")]
    UndefinedMetric { metric: String, reason: String },

    #[error("Non-convergence: {function} stopped after {iterations} iterations (best estimate: {best_estimate}, residual: {residual})")]
    NonConvergence {
        function: String,
        iterations: u32,
        best_estimate: Decimal,
        residual: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ViabilityError {
    pub(crate) fn project(field: &str, reason: impl Into<String>) -> Self {
        ViabilityError::InvalidProjectSpec {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn assumptions(field: &str, reason: impl Into<String>) -> Self {
        ViabilityError::InvalidAssumptions {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        ViabilityError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ViabilityError {
    fn from(e: serde_json::Error) -> Self {
        ViabilityError::SerializationError(e.to_string())
    }
}
