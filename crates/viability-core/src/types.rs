use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ViabilityError;
use crate::units::EnergyQuantity;
use crate::ViabilityResult;

/// All monetary values in USD. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.08 = 8%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Installed (nameplate) capacity
pub type Megawatts = Decimal;

/// Energy, always MWh inside the engine
pub type MegawattHours = Decimal;

/// Longest project life accepted. Keeps (1 + r)^t inside Decimal range.
pub const MAX_PROJECT_LIFETIME_YEARS: u32 = 80;

/// Generation technology of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Solar,
    Wind,
    Hydro,
    /// Fixed solar/wind capacity split, see `CostTables::hybrid_mix`
    Hybrid,
}

impl Technology {
    pub const ALL: [Technology; 4] = [
        Technology::Solar,
        Technology::Wind,
        Technology::Hydro,
        Technology::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Solar => "solar",
            Technology::Wind => "wind",
            Technology::Hydro => "hydro",
            Technology::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = ViabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solar" => Ok(Technology::Solar),
            "wind" => Ok(Technology::Wind),
            "hydro" => Ok(Technology::Hydro),
            "hybrid" => Ok(Technology::Hybrid),
            other => Err(ViabilityError::project(
                "technology",
                format!("unrecognised technology '{other}' (expected solar, wind, hydro or hybrid)"),
            )),
        }
    }
}

/// Site attributes that move cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Distance to the nearest grid connection point, km
    pub distance_to_grid_km: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Decimal>,
}

/// Immutable description of the project being valued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub technology: Technology,
    pub capacity_mw: Megawatts,
    pub location: LocationProfile,
    /// Expected annual delivered energy
    pub annual_generation: EnergyQuantity,
    /// First day of commercial operation; only labels cash-flow years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commercial_operation_date: Option<NaiveDate>,
}

impl ProjectSpec {
    pub fn annual_generation_mwh(&self) -> MegawattHours {
        self.annual_generation.to_mwh()
    }

    pub fn validate(&self) -> ViabilityResult<()> {
        if self.capacity_mw <= Decimal::ZERO {
            return Err(ViabilityError::project(
                "capacity_mw",
                "Installed capacity must be positive",
            ));
        }
        if self.annual_generation.value <= Decimal::ZERO {
            return Err(ViabilityError::project(
                "annual_generation",
                "Annual generation must be positive",
            ));
        }
        if self.location.distance_to_grid_km < Decimal::ZERO {
            return Err(ViabilityError::project(
                "location.distance_to_grid_km",
                "Distance to grid cannot be negative",
            ));
        }
        let nameplate = crate::units::implied_capacity_factor(
            self.annual_generation_mwh(),
            self.capacity_mw,
        )?;
        if nameplate > Decimal::ONE {
            return Err(ViabilityError::project(
                "annual_generation",
                format!(
                    "{} MWh/yr exceeds what {} MW can produce running continuously",
                    self.annual_generation_mwh(),
                    self.capacity_mw
                ),
            ));
        }
        Ok(())
    }
}

fn default_electricity_price() -> Money {
    dec!(50)
}

fn default_lifetime() -> u32 {
    25
}

fn default_discount_rate() -> Rate {
    dec!(0.08)
}

/// Market and financing assumptions supplied per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialAssumptions {
    /// Energy price, USD/MWh
    #[serde(default = "default_electricity_price")]
    pub electricity_price_usd_per_mwh: Money,
    #[serde(default = "default_lifetime")]
    pub project_lifetime_years: u32,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Rate,
    /// Renewable energy credit price, USD/MWh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rec_price_usd_per_mwh: Option<Money>,
    /// Flat capacity payment, USD per MW per year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_payment_usd_per_mw_year: Option<Money>,
}

impl Default for FinancialAssumptions {
    fn default() -> Self {
        Self {
            electricity_price_usd_per_mwh: default_electricity_price(),
            project_lifetime_years: default_lifetime(),
            discount_rate: default_discount_rate(),
            rec_price_usd_per_mwh: None,
            capacity_payment_usd_per_mw_year: None,
        }
    }
}

impl FinancialAssumptions {
    pub fn validate(&self) -> ViabilityResult<()> {
        if self.electricity_price_usd_per_mwh <= Decimal::ZERO {
            return Err(ViabilityError::assumptions(
                "electricity_price_usd_per_mwh",
                "Electricity price must be positive",
            ));
        }
        if self.project_lifetime_years == 0 {
            return Err(ViabilityError::assumptions(
                "project_lifetime_years",
                "Project lifetime must be at least 1 year",
            ));
        }
        if self.project_lifetime_years > MAX_PROJECT_LIFETIME_YEARS {
            return Err(ViabilityError::assumptions(
                "project_lifetime_years",
                format!("Project lifetime cannot exceed {MAX_PROJECT_LIFETIME_YEARS} years"),
            ));
        }
        if self.discount_rate <= dec!(-1) {
            return Err(ViabilityError::assumptions(
                "discount_rate",
                "Discount rate must be greater than -100%",
            ));
        }
        if self.discount_rate < Decimal::ZERO || self.discount_rate >= Decimal::ONE {
            return Err(ViabilityError::assumptions(
                "discount_rate",
                "Discount rate must be a fraction in [0, 1)",
            ));
        }
        if matches!(self.rec_price_usd_per_mwh, Some(p) if p < Decimal::ZERO) {
            return Err(ViabilityError::assumptions(
                "rec_price_usd_per_mwh",
                "REC price cannot be negative",
            ));
        }
        if matches!(self.capacity_payment_usd_per_mw_year, Some(p) if p < Decimal::ZERO) {
            return Err(ViabilityError::assumptions(
                "capacity_payment_usd_per_mw_year",
                "Capacity payment cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Why a metric has no value for this project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Annual net cash flow is zero or negative
    NonPositiveNetCashFlow,
    /// Year-0 flow is not an outflow
    NoInitialInvestment,
    ZeroCapex,
    NoGeneration,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndefinedReason::NonPositiveNetCashFlow => "annual net cash flow is not positive",
            UndefinedReason::NoInitialInvestment => "no initial investment outflow",
            UndefinedReason::ZeroCapex => "capital expenditure is zero",
            UndefinedReason::NoGeneration => "no energy generated",
        };
        f.write_str(s)
    }
}

/// A metric that is either computed or explicitly undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Metric<T> {
    Defined(T),
    Undefined(UndefinedReason),
}

impl<T> Metric<T> {
    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Defined(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Defined(v) => Some(v),
            Metric::Undefined(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Defined(v) => Metric::Defined(f(v)),
            Metric::Undefined(r) => Metric::Undefined(r),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
