use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Sample payload for a restricted schema.
///
/// Values are picked by field name first (ids, timestamps, emails, names),
/// then by enum, then by declared type. Timestamps use `now`; ids are random.
pub fn example_payload(schema: &Value, now: DateTime<Utc>) -> Value {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let Some(properties) = schema
        .get("properties")
        .and_then(Value::as_object)
        .filter(|p| !p.is_empty())
    else {
        return json!({
            "id": format!("example-{}", now.timestamp_millis()),
            "message": "Example message",
            "timestamp": timestamp,
        });
    };

    let mut example = Map::new();
    for (name, property) in properties {
        example.insert(name.clone(), example_value(name, property, now, &timestamp));
    }
    Value::Object(example)
}

fn example_value(
    name: &str,
    property: &Value,
    now: DateTime<Utc>,
    timestamp: &str,
) -> Value {
    let lower = name.to_lowercase();
    if lower.contains("id") {
        return Value::String(format!("example-{}", short_id()));
    }
    if lower.contains("timestamp") || lower.contains("date") || lower.contains("time") {
        return Value::String(timestamp.to_string());
    }
    if lower.contains("email") {
        return Value::String("user@example.com".into());
    }
    if lower.contains("name") {
        return Value::String("Example Name".into());
    }

    if let Some(first) = property
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return first.clone();
    }

    match property.get("type").and_then(Value::as_str) {
        Some("string") => match property.get("format").and_then(Value::as_str) {
            Some("date-time") => Value::String(timestamp.to_string()),
            Some("date") => Value::String(now.format("%Y-%m-%d").to_string()),
            Some("email") => Value::String("user@example.com".into()),
            Some("uri") => Value::String("https://example.com".into()),
            _ => Value::String("example-value".into()),
        },
        Some("integer") => json!(123),
        Some("number") => json!(123.45),
        Some("boolean") => json!(true),
        Some("array") => json!(["item1", "item2"]),
        _ => json!({"key": "value"}),
    }
}

/// First eight hex digits of a random v4 UUID
fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
