use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::{find_field, FieldDescriptor, FieldKind};

/// Raw state of one filled-in control
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Checked(bool),
    Text(String),
}

impl ControlValue {
    pub fn text(s: impl Into<String>) -> Self {
        ControlValue::Text(s.into())
    }
}

/// Build a payload from control values, coercing each to its declared type.
///
/// Controls without a matching field are skipped. Fields that coerce to
/// `null` or an empty string are left out of the payload.
pub fn collect_payload<I, K>(fields: &[FieldDescriptor], values: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, ControlValue)>,
    K: AsRef<str>,
{
    let mut payload = Map::new();

    for (name, raw) in values {
        let name = name.as_ref();
        let Some(field) = find_field(fields, name) else {
            tracing::debug!(target: "form", field = %name, "No field descriptor for control");
            continue;
        };

        let value = coerce(field, raw);
        let omit = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !omit {
            payload.insert(name.to_string(), value);
        }
    }

    payload
}

fn coerce(field: &FieldDescriptor, raw: ControlValue) -> Value {
    let text = match raw {
        ControlValue::Checked(checked) => {
            return match field.kind {
                FieldKind::Boolean => Value::Bool(checked),
                _ => Value::String(checked.to_string()),
            }
        }
        ControlValue::Text(text) => text,
    };

    match field.kind {
        FieldKind::Boolean => Value::Bool(matches!(text.trim(), "true" | "on" | "1")),
        FieldKind::Integer => parse_integer(&text).unwrap_or(Value::Null),
        FieldKind::Number => parse_number(&text),
        FieldKind::String if field.is_date_time() && !text.is_empty() => {
            match parse_local_input(&text) {
                Some(instant) => {
                    Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
                }
                None => Value::String(text),
            }
        }
        FieldKind::Array if !text.is_empty() => Value::Array(
            text.split(',')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(|piece| Value::String(piece.to_string()))
                .collect(),
        ),
        FieldKind::Object if !text.is_empty() => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        _ if text.is_empty() => Value::Null,
        _ => Value::String(text),
    }
}

/// Leading optional sign and digits; anything after them is ignored.
/// Digits beyond the `i64` range are kept as a float.
fn parse_integer(text: &str) -> Option<Value> {
    let s = text.trim();
    let digits_start = usize::from(s.starts_with(['+', '-']));
    let digits_end = s[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + digits_start);
    if digits_end == digits_start {
        return None;
    }
    let digits = &s[..digits_end];
    match digits.parse::<i64>() {
        Ok(i) => Some(Value::from(i)),
        Err(_) => digits
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
    }
}

fn parse_number(text: &str) -> Value {
    let s = text.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Datetime-local input, read as UTC. Full RFC 3339 instants are accepted too.
fn parse_local_input(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
