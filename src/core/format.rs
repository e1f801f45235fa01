//! Presentation formatting for raw payload values.

use crate::core::accessor::{numeric_value, to_plain_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Currency,
    Percentage,
    Number,
    #[default]
    #[serde(alias = "default")]
    Plain,
}

impl Display for ValueFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ValueFormat::Currency => "currency",
                ValueFormat::Percentage => "percentage",
                ValueFormat::Number => "number",
                ValueFormat::Plain => "plain",
            }
        )
    }
}

impl FromStr for ValueFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "currency" => Ok(ValueFormat::Currency),
            "percentage" | "percent" => Ok(ValueFormat::Percentage),
            "number" => Ok(ValueFormat::Number),
            "plain" | "default" => Ok(ValueFormat::Plain),
            _ => Err(anyhow::anyhow!("Invalid value format: {}", s)),
        }
    }
}

/// Formats `value` for display. Absent and `null` values render as `N/A`.
///
/// Numeric formats never fail: input that is not a number renders as `NaN`
/// inside the requested format.
pub fn format_value(value: Option<&Value>, format: ValueFormat) -> String {
    let value = match value {
        None | Some(Value::Null) => return "N/A".to_string(),
        Some(v) => v,
    };
    let number = || numeric_value(Some(value)).unwrap_or(f64::NAN);

    match format {
        ValueFormat::Currency => format_currency(number()),
        ValueFormat::Percentage => format_percentage(number()),
        ValueFormat::Number => format_number(number()),
        ValueFormat::Plain => to_plain_string(Some(value)),
    }
}

/// `$1,234.56` style US dollar amount.
pub fn format_currency(amount: f64) -> String {
    let sign = if amount.is_sign_negative() && !amount.is_nan() {
        "-"
    } else {
        ""
    };
    format!("{sign}${}", grouped(amount.abs(), 2, 2))
}

pub fn format_percentage(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}%")
    } else {
        format!("{}%", special_number(value, "Infinity"))
    }
}

/// Grouped number with up to three fraction digits.
pub fn format_number(value: f64) -> String {
    let sign = if value.is_sign_negative() && !value.is_nan() && value != 0.0 {
        "-"
    } else {
        ""
    };
    format!("{sign}{}", grouped(value.abs(), 0, 3))
}

fn special_number(value: f64, infinity: &str) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value > 0.0 {
        infinity.to_string()
    } else {
        format!("-{infinity}")
    }
}

// Expects a non-negative (or NaN) value.
fn grouped(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    if !value.is_finite() {
        return special_number(value, "∞");
    }

    let fixed = format!("{value:.max_fraction$}");
    let (int_part, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    let digits: Vec<char> = int_part.chars().collect();
    let mut int_grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            int_grouped.push(',');
        }
        int_grouped.push(*digit);
    }

    if fraction.is_empty() {
        int_grouped
    } else {
        format!("{int_grouped}.{fraction}")
    }
}
