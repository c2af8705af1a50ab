use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{display_value, find_field, Control, FieldDescriptor};

/// Initial state of one control
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefillValue {
    Checked(bool),
    Text(String),
}

/// Map example payload keys onto the described fields.
///
/// Keys that name no field are ignored, as is a non-object example.
pub fn populate_example(
    fields: &[FieldDescriptor],
    example: &Value,
) -> IndexMap<String, PrefillValue> {
    let mut prefill = IndexMap::new();
    let Some(example) = example.as_object() else {
        return prefill;
    };

    for (name, value) in example {
        let Some(field) = find_field(fields, name) else {
            continue;
        };

        let display = match field.control() {
            Control::Toggle => PrefillValue::Checked(value == &Value::Bool(true)),
            Control::DateTimeLocal => PrefillValue::Text(to_local_input(value)),
            _ => match value {
                Value::Array(items) => PrefillValue::Text(
                    items.iter().map(display_value).collect::<Vec<_>>().join(", "),
                ),
                Value::Object(_) => PrefillValue::Text(
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
                ),
                scalar => PrefillValue::Text(display_value(scalar)),
            },
        };
        prefill.insert(name.clone(), display);
    }

    prefill
}

/// ISO-8601 instant to `YYYY-MM-DDTHH:MM` in UTC
fn to_local_input(value: &Value) -> String {
    match value {
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(instant) => instant
                .with_timezone(&Utc)
                .format("%Y-%m-%dT%H:%M")
                .to_string(),
            Err(_) => s.clone(),
        },
        other => display_value(other),
    }
}
