use napi::Result as NapiResult;
use napi_derive::napi;

use property_finance_core::schedule::{reference, RateSchedule};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse and validate the caller's schedule. An empty string selects the
/// bundled reference schedule.
fn load_schedule(schedule_json: &str) -> NapiResult<RateSchedule> {
    if schedule_json.trim().is_empty() {
        return Ok(reference::singapore_2024());
    }
    RateSchedule::from_json_str(schedule_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Validate a schedule and echo it back in canonical form.
#[napi]
pub fn validate_schedule(schedule_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Duties and loans
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_stamp_duty(schedule_json: String, input_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    let input: property_finance_core::stamp_duty::StampDutyInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::stamp_duty::compute_stamp_duty(&input, &schedule)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_mortgage(schedule_json: String, input_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    let input: property_finance_core::amortization::LoanParameters =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::amortization::calculate_mortgage(&input, &schedule)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn assess_debt_servicing(schedule_json: String, input_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    let input: property_finance_core::debt_servicing::DebtServicingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::debt_servicing::assess_debt_servicing(&input, &schedule)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[napi]
pub fn resolve_affordability(schedule_json: String, input_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    let input: property_finance_core::affordability::AffordabilityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::affordability::resolve_affordability(&input, &schedule)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn optimize_cpf_usage(schedule_json: String, input_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    let input: property_finance_core::cpf_optimizer::CpfOptimizerInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::cpf_optimizer::optimize_cpf_usage(&input, &schedule)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_total_cost(schedule_json: String, input_json: String) -> NapiResult<String> {
    let schedule = load_schedule(&schedule_json)?;
    let input: property_finance_core::ownership::TcoInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = property_finance_core::ownership::project_total_cost(&input, &schedule)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
