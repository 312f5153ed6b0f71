use serde_json::Value;

use super::{flatten, format_scalar, result_of};

/// Headline field per command, in priority order.
const PRIORITY_KEYS: [&str; 9] = [
    "viability.verdict",
    "verdict",
    "overall_level",
    "baseline_npv",
    "net_present_value",
    "annual_net_cash_flow",
    "total_capex",
    "annual_generation_mwh",
    "total_score",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);
    let mut flat = Vec::new();
    flatten("", result, &mut flat);

    for key in PRIORITY_KEYS {
        if let Some((_, val)) = flat.iter().find(|(k, v)| k == key && !v.is_null()) {
            println!("{}", format_scalar(val));
            return;
        }
    }

    match flat.first() {
        Some((key, val)) if !key.is_empty() => println!("{key}: {}", format_scalar(val)),
        _ => println!("{}", format_scalar(result)),
    }
}
