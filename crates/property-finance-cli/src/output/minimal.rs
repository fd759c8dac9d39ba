use serde_json::Value;

use super::cell;

/// Headline field per operation, in priority order.
const PRIORITY_KEYS: [&str; 7] = [
    "max_affordable_price",
    "recommended_scenario",
    "grand_total_cost",
    "total_buyer_duty",
    "monthly_payment",
    "max_monthly_repayment",
    "version",
];

/// Print just the headline value from the output, falling back to the
/// first field of the result.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result {
        if let Some(val) = PRIORITY_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find(|v| !v.is_null())
        {
            println!("{}", cell(val));
            return;
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result));
}
