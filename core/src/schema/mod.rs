//! Payload schemas for channels.
//!
//! `introspect` derives the restricted JSON Schema a topology descriptor
//! carries for a channel (`type`, `properties`, `required`) from a Rust type,
//! and `example_payload` fills a schema with plausible sample values.

mod example;

pub use example::example_payload;

use schemars::JsonSchema;
use serde_json::{json, Map, Value};

use crate::form::StringFormat;

/// Restricted object schema for `T`
pub fn introspect<T: JsonSchema>() -> crate::Result<Value> {
    let full = serde_json::to_value(schemars::schema_for!(T))?;
    Ok(restrict(&full))
}

/// Reduce a full JSON Schema document to the subset the composer understands
pub fn restrict(full: &Value) -> Value {
    let defs = full
        .get("$defs")
        .or_else(|| full.get("definitions"))
        .and_then(Value::as_object);

    let mut properties = Map::new();
    if let Some(props) = full.get("properties").and_then(Value::as_object) {
        for (name, property) in props {
            properties.insert(name.clone(), restrict_property(property, defs));
        }
    }

    let required = full
        .get("required")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "required": required,
    });
    if let Some(title) = full.get("title") {
        schema["title"] = title.clone();
    }
    schema
}

fn restrict_property(property: &Value, defs: Option<&Map<String, Value>>) -> Value {
    let property = resolve_ref(property, defs).unwrap_or(property);

    let type_name = match property.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        // nullable types are reported as ["T", "null"]
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    };

    let mut out = Map::new();
    match (type_name, property.get("enum")) {
        (Some(t), _) => {
            out.insert("type".into(), Value::String(t.to_string()));
        }
        (None, Some(_)) => {
            out.insert("type".into(), Value::String("string".into()));
        }
        (None, None) => {
            out.insert("type".into(), Value::String("object".into()));
        }
    }

    if let Some(values) = property.get("enum").and_then(Value::as_array) {
        let values: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
        out.insert("enum".into(), Value::Array(values));
    }

    if type_name == Some("string") {
        if let Some(format) = property
            .get("format")
            .and_then(Value::as_str)
            .filter(|f| StringFormat::parse(f).is_some())
        {
            out.insert("format".into(), Value::String(format.to_string()));
        }
    }

    if let Some(description) = property.get("description") {
        out.insert("description".into(), description.clone());
    }

    Value::Object(out)
}

/// Follow a local `$ref`, directly or through a single-entry `anyOf`/`allOf`
fn resolve_ref<'a>(property: &'a Value, defs: Option<&'a Map<String, Value>>) -> Option<&'a Value> {
    let reference = property.get("$ref").and_then(Value::as_str).or_else(|| {
        ["allOf", "anyOf", "oneOf"].iter().find_map(|key| {
            property
                .get(*key)
                .and_then(Value::as_array)
                .and_then(|variants| {
                    variants
                        .iter()
                        .find_map(|v| v.get("$ref").and_then(Value::as_str))
                })
        })
    })?;
    let name = reference.rsplit('/').next()?;
    defs?.get(name)
}
