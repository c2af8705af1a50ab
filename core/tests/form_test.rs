//! Schema form bridge tests
//!
//! - describe_fields(): field kinds, formats, enums, required flags
//! - populate_example(): prefill conversions
//! - collect_payload(): coercion and omission rules

use serde_json::{json, Value};
use tapestry_core::{
    collect_payload, describe_fields, has_form_schema, populate_example, Control, ControlValue,
    FieldKind, PrefillValue, StringFormat,
};

fn person_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "integer"}
        },
        "required": ["name"]
    })
}

fn order_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "string", "description": "Order id"},
            "placedAt": {"type": "string", "format": "date-time"},
            "deliveryDate": {"type": "string", "format": "date"},
            "contact": {"type": "string", "format": "email"},
            "callback": {"type": "string", "format": "uri"},
            "status": {"type": "string", "format": "email", "enum": ["NEW", "PAID"]},
            "quantity": {"type": "integer"},
            "price": {"type": "number"},
            "express": {"type": "boolean"},
            "tags": {"type": "array"},
            "meta": {"type": "object"},
            "mystery": {"type": "uuid"},
            "untyped": {}
        },
        "required": ["id", "quantity"]
    })
}

// =============================================================================
// describe_fields()
// =============================================================================

#[test]
fn fields_follow_property_order() {
    let fields = describe_fields(&order_schema());
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "id", "placedAt", "deliveryDate", "contact", "callback", "status", "quantity",
            "price", "express", "tags", "meta", "mystery", "untyped"
        ]
    );
}

#[test]
fn controls_match_declared_types() {
    let fields = describe_fields(&order_schema());
    let control = |name: &str| {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.control())
            .unwrap()
    };

    assert_eq!(control("id"), Control::Text);
    assert_eq!(control("placedAt"), Control::DateTimeLocal);
    assert_eq!(control("deliveryDate"), Control::Date);
    assert_eq!(control("contact"), Control::Email);
    assert_eq!(control("callback"), Control::Url);
    assert_eq!(
        control("status"),
        Control::Select {
            options: vec!["NEW".into(), "PAID".into()]
        }
    );
    assert_eq!(control("quantity"), Control::Number { step: "1".into() });
    assert_eq!(control("price"), Control::Number { step: "any".into() });
    assert_eq!(control("express"), Control::Toggle);
    assert!(matches!(control("tags"), Control::TextArea { rows: 3, .. }));
    assert!(matches!(control("meta"), Control::TextArea { rows: 4, .. }));
    assert_eq!(control("mystery"), Control::Text);
    assert_eq!(control("untyped"), Control::Text);
}

#[test]
fn descriptors_carry_required_format_and_description() {
    let fields = describe_fields(&order_schema());
    let id = &fields[0];
    assert!(id.required);
    assert_eq!(id.kind, FieldKind::String);
    assert_eq!(id.description.as_deref(), Some("Order id"));

    assert_eq!(fields[1].format, Some(StringFormat::DateTime));
    assert!(!fields[1].required);
    assert!(fields[6].required);

    let mystery = fields.iter().find(|f| f.name == "mystery").unwrap();
    assert_eq!(mystery.kind, FieldKind::Unrecognized);
}

#[test]
fn format_is_ignored_for_non_strings() {
    let fields = describe_fields(&json!({
        "properties": {"count": {"type": "integer", "format": "date-time"}}
    }));
    assert_eq!(fields[0].format, None);
    assert_eq!(fields[0].control(), Control::Number { step: "1".into() });
}

#[test]
fn schema_without_properties_yields_no_fields() {
    assert!(describe_fields(&json!({"type": "object"})).is_empty());
    assert!(describe_fields(&json!({"type": "object", "properties": {}})).is_empty());
    assert!(describe_fields(&Value::Null).is_empty());

    assert!(!has_form_schema(&json!({"type": "object"})));
    assert!(has_form_schema(&json!({"properties": {}})));
}

// =============================================================================
// populate_example()
// =============================================================================

#[test]
fn example_values_are_converted_for_their_controls() {
    let fields = describe_fields(&order_schema());
    let example = json!({
        "id": "o-1",
        "placedAt": "2024-05-06T07:08:09.123Z",
        "quantity": 3,
        "price": 9.5,
        "express": true,
        "tags": ["a", "b", 3],
        "meta": {"k": "v"},
        "status": "PAID",
        "unknownKey": "ignored",
        "mystery": null
    });

    let prefill = populate_example(&fields, &example);

    assert_eq!(prefill["id"], PrefillValue::Text("o-1".into()));
    assert_eq!(prefill["placedAt"], PrefillValue::Text("2024-05-06T07:08".into()));
    assert_eq!(prefill["quantity"], PrefillValue::Text("3".into()));
    assert_eq!(prefill["price"], PrefillValue::Text("9.5".into()));
    assert_eq!(prefill["express"], PrefillValue::Checked(true));
    assert_eq!(prefill["tags"], PrefillValue::Text("a, b, 3".into()));
    assert_eq!(
        prefill["meta"],
        PrefillValue::Text("{\n  \"k\": \"v\"\n}".into())
    );
    assert_eq!(prefill["status"], PrefillValue::Text("PAID".into()));
    assert_eq!(prefill["mystery"], PrefillValue::Text(String::new()));
    assert!(!prefill.contains_key("unknownKey"));
}

#[test]
fn toggle_is_checked_only_for_true() {
    let fields = describe_fields(&json!({"properties": {"flag": {"type": "boolean"}}}));
    assert_eq!(
        populate_example(&fields, &json!({"flag": "true"}))["flag"],
        PrefillValue::Checked(false)
    );
    assert_eq!(
        populate_example(&fields, &json!({"flag": false}))["flag"],
        PrefillValue::Checked(false)
    );
}

#[test]
fn non_object_example_prefills_nothing() {
    let fields = describe_fields(&person_schema());
    assert!(populate_example(&fields, &json!(["Ada"])).is_empty());
    assert!(populate_example(&fields, &Value::Null).is_empty());
}

// =============================================================================
// collect_payload()
// =============================================================================

#[test]
fn integer_field_is_sent_as_number() {
    let fields = describe_fields(&person_schema());
    let payload = collect_payload(
        &fields,
        [("name", ControlValue::text("Ada")), ("age", ControlValue::text("37"))],
    );
    assert_eq!(Value::Object(payload), json!({"name": "Ada", "age": 37}));
}

#[test]
fn empty_optional_field_is_omitted() {
    let fields = describe_fields(&person_schema());
    let payload = collect_payload(
        &fields,
        [("name", ControlValue::text("Ada")), ("age", ControlValue::text(""))],
    );
    assert_eq!(Value::Object(payload.clone()), json!({"name": "Ada"}));
    assert!(!payload.contains_key("age"));
}

#[test]
fn values_are_coerced_per_declared_type() {
    let fields = describe_fields(&order_schema());
    let payload = collect_payload(
        &fields,
        vec![
            ("id".to_string(), ControlValue::text("o-1")),
            ("placedAt".to_string(), ControlValue::text("2024-05-06T07:08")),
            ("deliveryDate".to_string(), ControlValue::text("2024-05-07")),
            ("quantity".to_string(), ControlValue::text("12.7")),
            ("price".to_string(), ControlValue::text("19.99")),
            ("express".to_string(), ControlValue::Checked(false)),
            ("tags".to_string(), ControlValue::text(" red, ,blue ,")),
            ("meta".to_string(), ControlValue::text("{\"gift\": true}")),
            ("status".to_string(), ControlValue::text("NEW")),
        ],
    );

    assert_eq!(
        Value::Object(payload),
        json!({
            "id": "o-1",
            "placedAt": "2024-05-06T07:08:00.000Z",
            "deliveryDate": "2024-05-07",
            "quantity": 12,
            "price": 19.99,
            "express": false,
            "tags": ["red", "blue"],
            "meta": {"gift": true},
            "status": "NEW"
        })
    );
}

#[test]
fn oversized_integer_is_kept_as_float() {
    let fields = describe_fields(&person_schema());
    let payload = collect_payload(&fields, [("age", ControlValue::text("99999999999999999999"))]);
    assert_eq!(Value::Object(payload), json!({"age": 1e20}));
}

#[test]
fn malformed_values_fall_back_without_failing() {
    let fields = describe_fields(&order_schema());
    let payload = collect_payload(
        &fields,
        [
            ("meta", ControlValue::text("{not json")),
            ("placedAt", ControlValue::text("next tuesday")),
            ("quantity", ControlValue::text("many")),
            ("price", ControlValue::text("")),
            ("tags", ControlValue::text("")),
            ("callback", ControlValue::text("")),
            ("ghost", ControlValue::text("no such field")),
        ],
    );

    assert_eq!(
        Value::Object(payload),
        json!({
            "meta": "{not json",
            "placedAt": "next tuesday"
        })
    );
}

#[test]
fn prefilled_example_round_trips_through_collect() {
    let fields = describe_fields(&order_schema());
    let example = json!({
        "id": "o-9",
        "placedAt": "2024-05-06T07:08:00.000Z",
        "quantity": 2,
        "express": true,
        "tags": ["x", "y"]
    });

    let values = populate_example(&fields, &example)
        .into_iter()
        .map(|(name, prefill)| {
            let value = match prefill {
                PrefillValue::Checked(b) => ControlValue::Checked(b),
                PrefillValue::Text(s) => ControlValue::Text(s),
            };
            (name, value)
        });

    assert_eq!(Value::Object(collect_payload(&fields, values)), example);
}
