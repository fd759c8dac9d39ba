use serde_json::Value;

use property_finance_core::schedule::RateSchedule;

/// Echo the active (validated) schedule.
pub fn run_schedule(schedule: &RateSchedule) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::json!({
        "result": schedule,
        "warnings": [],
        "methodology": "Validated regulatory rate schedule",
    }))
}
