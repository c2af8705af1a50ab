//! Schema-driven message composer.
//!
//! Turns the JSON Schema of a channel payload into a description of input
//! controls, prefills those controls from an example payload, and reads the
//! filled-in values back into a JSON payload. Nothing here fails: unknown
//! types degrade to plain text and malformed values fall back to raw text.

mod collect;
mod prefill;

pub use collect::{collect_payload, ControlValue};
pub use prefill::{populate_example, PrefillValue};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared JSON type of a schema property
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// Missing or unrecognized `type`, rendered as plain text
    Unrecognized,
}

impl FieldKind {
    pub fn from_schema(type_name: Option<&str>) -> Self {
        match type_name {
            Some("string") => FieldKind::String,
            Some("integer") => FieldKind::Integer,
            Some("number") => FieldKind::Number,
            Some("boolean") => FieldKind::Boolean,
            Some("array") => FieldKind::Array,
            Some("object") => FieldKind::Object,
            _ => FieldKind::Unrecognized,
        }
    }
}

/// String formats that get a dedicated control
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    DateTime,
    Date,
    Email,
    Uri,
}

impl StringFormat {
    pub fn parse(format: &str) -> Option<Self> {
        match format {
            "date-time" => Some(StringFormat::DateTime),
            "date" => Some(StringFormat::Date),
            "email" => Some(StringFormat::Email),
            "uri" => Some(StringFormat::Uri),
            _ => None,
        }
    }
}

/// Input control a field renders as
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Text,
    Select { options: Vec<String> },
    DateTimeLocal,
    Date,
    Email,
    Url,
    Number { step: String },
    Toggle,
    TextArea { rows: u8, placeholder: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Choose the control for this field. An enum wins over a string format.
    pub fn control(&self) -> Control {
        match (&self.kind, &self.enum_values, self.format) {
            (FieldKind::Boolean, _, _) => Control::Toggle,
            (_, Some(options), _) => Control::Select {
                options: options.clone(),
            },
            (FieldKind::String, None, Some(StringFormat::DateTime)) => Control::DateTimeLocal,
            (FieldKind::String, None, Some(StringFormat::Date)) => Control::Date,
            (FieldKind::String, None, Some(StringFormat::Email)) => Control::Email,
            (FieldKind::String, None, Some(StringFormat::Uri)) => Control::Url,
            (FieldKind::Integer, None, _) => Control::Number { step: "1".into() },
            (FieldKind::Number, None, _) => Control::Number { step: "any".into() },
            (FieldKind::Array, None, _) => Control::TextArea {
                rows: 3,
                placeholder: "Enter comma-separated values".into(),
            },
            (FieldKind::Object, None, _) => Control::TextArea {
                rows: 4,
                placeholder: "Enter JSON object".into(),
            },
            _ => Control::Text,
        }
    }

    pub(crate) fn is_date_time(&self) -> bool {
        self.kind == FieldKind::String && self.format == Some(StringFormat::DateTime)
    }
}

/// Whether the schema declares a `properties` mapping at all.
///
/// Callers show a "no schema available" state instead of an empty form when
/// this is false.
pub fn has_form_schema(schema: &Value) -> bool {
    schema.get("properties").is_some_and(Value::is_object)
}

/// Describe one input field per schema property, in document order
pub fn describe_fields(schema: &Value) -> Vec<FieldDescriptor> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            let kind = FieldKind::from_schema(property.get("type").and_then(Value::as_str));
            let format = if kind == FieldKind::String {
                property
                    .get("format")
                    .and_then(Value::as_str)
                    .and_then(StringFormat::parse)
            } else {
                None
            };
            let enum_values = property
                .get("enum")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(display_value).collect());

            FieldDescriptor {
                name: name.clone(),
                kind,
                format,
                enum_values,
                required: required.contains(&name.as_str()),
                description: property
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect()
}

/// Text shown for a JSON value inside a control
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn find_field<'a>(fields: &'a [FieldDescriptor], name: &str) -> Option<&'a FieldDescriptor> {
    fields.iter().find(|f| f.name == name)
}
