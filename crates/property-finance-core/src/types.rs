use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values, in SGD. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Buyer residency status, the first key of the ABSD table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Residency {
    #[default]
    Citizen,
    PermanentResident,
    Foreigner,
}

/// Property segment. HDB and EC purchases are subject to MSR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Hdb,
    Ec,
    #[default]
    Condo,
    Landed,
}

impl PropertyType {
    /// Whether the Mortgage Servicing Ratio applies to this segment.
    pub fn msr_applies(self) -> bool {
        matches!(self, PropertyType::Hdb | PropertyType::Ec)
    }

    /// Whether a monthly condominium maintenance fee is payable.
    pub fn has_condo_maintenance(self) -> bool {
        matches!(self, PropertyType::Ec | PropertyType::Condo)
    }
}

/// How the owner uses the property. Drives the property tax table and rental income.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyUsage {
    #[default]
    OwnerOccupied,
    Investment,
}

/// Outcome of a single regulatory check at the resolved price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub ratio_actual: Rate,
    pub limit: Rate,
    pub within_limit: bool,
    pub is_binding: bool,
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
    pub schedule_version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    schedule_version: &str,
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
            schedule_version: schedule_version.to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Round a monetary amount to cents for presentation.
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
