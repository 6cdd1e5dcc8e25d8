//! Value coercion: map a loosely-typed user value onto a column's declared type.
//!
//! The declared type is matched loosely (case-insensitive substring), the way SQLite derives
//! column affinity. Rules are tried in order and the first match wins, so `DATETIME` is never
//! caught by the numeric rules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::CellValue;

/// One coercion rule: applies when `matches(upper_declared_type)` is true.
pub struct CoercionRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub apply: fn(&Value) -> CellValue,
}

/// Ordered cascade; anything that matches none of these is stringified.
pub const COERCION_RULES: &[CoercionRule] = &[
    CoercionRule {
        name: "integer",
        matches: is_integer_type,
        apply: to_integer,
    },
    CoercionRule {
        name: "real",
        matches: is_real_type,
        apply: to_real,
    },
    CoercionRule {
        name: "datetime",
        matches: is_datetime_type,
        apply: to_datetime,
    },
];

fn is_integer_type(t: &str) -> bool {
    t.contains("INT") || t.contains("BOOL")
}

fn is_real_type(t: &str) -> bool {
    ["REAL", "FLOAT", "DOUBLE", "NUMERIC", "DECIMAL"]
        .into_iter()
        .any(|k| t.contains(k))
}

fn is_datetime_type(t: &str) -> bool {
    t.contains("DATE") || t.contains("TIME")
}

/// Coerce `raw` for storage in a column declared as `declared_type`.
///
/// JSON null and the literal text `NULL` become SQL NULL. Values that do not fit the
/// column's affinity fall back to their text form rather than being dropped.
pub fn cast_value(raw: &Value, declared_type: &str) -> CellValue {
    if is_null_input(raw) {
        return CellValue::Null;
    }
    let upper = declared_type.to_ascii_uppercase();
    match COERCION_RULES.iter().find(|rule| (rule.matches)(&upper)) {
        Some(rule) => (rule.apply)(raw),
        None => CellValue::Text(text_form(raw)),
    }
}

/// Name of the rule that would handle `declared_type`, or `"text"`.
pub fn rule_for(declared_type: &str) -> &'static str {
    let upper = declared_type.to_ascii_uppercase();
    COERCION_RULES
        .iter()
        .find(|rule| (rule.matches)(&upper))
        .map_or("text", |rule| rule.name)
}

fn is_null_input(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s == "NULL",
        _ => false,
    }
}

/// Text form of a raw value: strings verbatim, everything else as JSON text.
pub fn text_form(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Exact integer if the input is one, otherwise a finite float. Booleans count as 0/1.
fn parse_number(raw: &Value) -> Option<Number> {
    match raw {
        Value::Bool(b) => Some(Number::Int(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(Number::Int)
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(Number::Float)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(i) = s.parse::<i64>() {
                return Some(Number::Int(i));
            }
            // Rust also accepts "inf"/"nan"; those stay text
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Number::Float)
        }
        _ => None,
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

fn to_integer(raw: &Value) -> CellValue {
    match parse_number(raw) {
        Some(Number::Int(i)) => CellValue::Integer(i),
        Some(Number::Float(f)) => {
            let t = f.trunc();
            if t >= i64::MIN as f64 && t < i64::MAX as f64 {
                CellValue::Integer(t as i64)
            } else {
                CellValue::Real(t)
            }
        }
        None => CellValue::Text(text_form(raw)),
    }
}

fn to_real(raw: &Value) -> CellValue {
    match parse_number(raw) {
        Some(Number::Int(i)) => CellValue::Real(i as f64),
        Some(Number::Float(f)) => CellValue::Real(f),
        None => CellValue::Text(text_form(raw)),
    }
}

fn to_datetime(raw: &Value) -> CellValue {
    let s = text_form(raw).trim().to_string();
    if has_iso_date_prefix(&s) {
        return CellValue::Text(s);
    }
    match parse_loose_datetime(&s) {
        Some(dt) => CellValue::Text(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => CellValue::Text(s),
    }
}

/// True when `s` starts with `YYYY-MM-DD` (digits only checked, not calendar validity).
pub fn has_iso_date_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%b %d %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d", "%m/%d/%Y", "%b %d %Y", "%b %d, %Y", "%B %d %Y", "%B %d, %Y", "%d %b %Y",
    "%d %B %Y",
];

/// Best-effort parse of common date spellings. Naive values are taken as UTC.
fn parse_loose_datetime(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
