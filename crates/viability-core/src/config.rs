use serde::{Deserialize, Serialize};

use crate::cost_model::tables::CostTables;
use crate::time_value::IrrSolverSettings;
use crate::viability::ViabilityThresholds;
use crate::ViabilityResult;

#[cfg(feature = "risk")]
use crate::risk::RiskThresholds;
#[cfg(feature = "sensitivity")]
use crate::scenarios::sensitivity::SweepSettings;

/// Every tunable constant the engine uses, passed explicitly to each
/// operation. Missing sections fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cost_tables: CostTables,
    pub solver: IrrSolverSettings,
    pub viability: ViabilityThresholds,
    #[cfg(feature = "risk")]
    pub risk: RiskThresholds,
    #[cfg(feature = "sensitivity")]
    pub sensitivity: SweepSettings,
}

impl EngineConfig {
    pub fn validate(&self) -> ViabilityResult<()> {
        self.cost_tables.validate()?;
        self.solver.validate()?;
        self.viability.validate()?;
        #[cfg(feature = "risk")]
        self.risk.validate()?;
        #[cfg(feature = "sensitivity")]
        self.sensitivity.validate()?;
        Ok(())
    }

    /// Parse and validate a (possibly partial) JSON config.
    pub fn from_json_str(s: &str) -> ViabilityResult<Self> {
        let config: EngineConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
