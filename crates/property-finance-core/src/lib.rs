pub mod amortization;
pub mod brackets;
pub mod debt_servicing;
pub mod error;
pub mod schedule;
pub mod stamp_duty;
pub mod time_value;
pub mod types;

#[cfg(feature = "affordability")]
pub mod affordability;

#[cfg(feature = "cpf")]
pub mod cpf_optimizer;

#[cfg(feature = "ownership")]
pub mod ownership;

pub use error::PropertyFinanceError;
pub use schedule::RateSchedule;
pub use types::*;

/// Standard result type for all property-finance operations
pub type PropertyFinanceResult<T> = Result<T, PropertyFinanceError>;
