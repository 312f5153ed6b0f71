pub mod case;
pub mod metrics;

pub use case::{ValuationCase, ValueDriver};
pub use metrics::{FinancialMetrics, IrrEstimate, Valuation};
