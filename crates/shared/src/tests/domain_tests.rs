use super::*;
use serde_json::json;

#[test]
fn request_trims_both_fields() {
    let request = ClassificationRequest::new("  HVAC service \n", "\tAcme  ");
    assert_eq!(request.description, "HVAC service");
    assert_eq!(request.supplier, "Acme");
    assert!(request.is_classifiable());
}

#[test]
fn whitespace_only_description_is_not_classifiable() {
    assert!(!ClassificationRequest::new("", "Acme").is_classifiable());
    assert!(!ClassificationRequest::new(" \n\t ", "").is_classifiable());
}

#[test]
fn summary_renders_all_three_labels() {
    let result =
        ClassificationResult::parse(r#"{"L1":"Facilities","L2":"Maintenance","L3":"HVAC"}"#)
            .expect("json");
    let summary = result.summary().expect("summary");
    assert_eq!(
        summary.lines(),
        ["L1: Facilities", "L2: Maintenance", "L3: HVAC"].map(String::from)
    );
    assert_eq!(
        result.value(),
        &json!({"L1": "Facilities", "L2": "Maintenance", "L3": "HVAC"})
    );
}

#[test]
fn summary_accepts_lowercase_keys_and_fills_placeholders() {
    let result = ClassificationResult::parse(r#"{"l1":"A"}"#).expect("json");
    let summary = result.summary().expect("summary");
    assert_eq!(summary.lines(), ["L1: A", "L2: -", "L3: -"].map(String::from));
}

#[test]
fn summary_prefers_uppercase_and_skips_empty_values() {
    let result = ClassificationResult(json!({
        "L1": "Upper",
        "l1": "lower",
        "L2": null,
        "l2": "fallback",
        "L3": "",
        "l3": "leaf"
    }));
    let summary = result.summary().expect("summary");
    assert_eq!(summary.l1.as_deref(), Some("Upper"));
    assert_eq!(summary.l2.as_deref(), Some("fallback"));
    assert_eq!(summary.l3.as_deref(), Some("leaf"));
}

#[test]
fn summary_is_absent_for_objects_without_labels_and_non_objects() {
    assert!(ClassificationResult(json!({"category": "x"})).summary().is_none());
    assert!(ClassificationResult(json!(["L1", "L2"])).summary().is_none());
    assert!(ClassificationResult(json!("Facilities")).summary().is_none());
}

#[test]
fn non_string_labels_render_as_json() {
    let summary = ClassificationResult(json!({"L1": 42, "L2": ["a", "b"]}))
        .summary()
        .expect("summary");
    assert_eq!(summary.l1.as_deref(), Some("42"));
    assert_eq!(summary.l2.as_deref(), Some(r#"["a","b"]"#));
}

#[test]
fn invalid_json_does_not_parse() {
    assert!(ClassificationResult::parse("not valid json").is_err());
}

#[test]
fn pretty_json_uses_two_space_indent() {
    let result = ClassificationResult(json!({"L1": "Facilities"}));
    assert_eq!(result.to_pretty_json(), "{\n  \"L1\": \"Facilities\"\n}");
}

#[test]
fn history_entry_uses_placeholder_for_empty_supplier() {
    let request = ClassificationRequest::new("Printer toner", "   ");
    let entry = HistoryEntry::new(&request, ClassificationResult(json!({})));
    assert_eq!(entry.supplier, PLACEHOLDER);
    assert_eq!(entry.description, "Printer toner");
}

#[test]
fn session_id_round_trips_through_display() {
    let id = SessionId::random();
    let parsed: SessionId = id.to_string().parse().expect("parse");
    assert_eq!(parsed, id);
    assert!("not-a-uuid".parse::<SessionId>().is_err());
}

#[test]
fn boolean_labels_render_in_json_form() {
    let summary = ClassificationResult(json!({"L1": true, "l2": "Services"}))
        .summary()
        .expect("summary");
    assert_eq!(
        summary.lines(),
        ["L1: true", "L2: Services", "L3: -"].map(String::from)
    );
}
