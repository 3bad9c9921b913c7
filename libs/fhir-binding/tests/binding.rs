use async_trait::async_trait;
use ferrum_binding::{
    fhir_entity, CardinalityValidator, Entity, EntityKind, Error, Extension, ExtensionValue,
    FhirVersion, IssueCode, Node, PropertyDef, PropertyRegistry, StaticCatalog, ValidationIssue,
    ValidationOutcome, Validator, ValidatorConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;

const AMOUNT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("value"),
    PropertyDef::primitive("unit"),
];

static AMOUNT: PropertyRegistry =
    PropertyRegistry::new("Amount", EntityKind::DataType, AMOUNT_PROPERTIES);

fn amount_registry() -> &'static PropertyRegistry {
    &AMOUNT
}

const REMARK_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("authorString").choice_of("author"),
    PropertyDef::opaque("authorReference").choice_of("author"),
    PropertyDef::primitive("text").required(),
];

static REMARK: PropertyRegistry =
    PropertyRegistry::new("Remark", EntityKind::DataType, REMARK_PROPERTIES);

fn remark_registry() -> &'static PropertyRegistry {
    &REMARK
}

const TASK_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("status").required(),
    PropertyDef::primitive("code"),
    PropertyDef::primitive("tag").many(),
    PropertyDef::primitive("valueString").choice_of("value"),
    PropertyDef::primitive("valueBoolean").choice_of("value"),
    PropertyDef::complex("valueAmount", amount_registry).choice_of("value"),
    PropertyDef::complex("note", remark_registry).many(),
];

static TASK: PropertyRegistry =
    PropertyRegistry::new("Task", EntityKind::DomainResource, TASK_PROPERTIES);

fhir_entity! {
    pub struct Task => TASK;
    pub builder TaskBuilder;
}

fhir_entity! {
    pub struct Remark => REMARK;
    pub builder RemarkBuilder;
}

fn keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn full_task() -> Value {
    json!({
        "resourceType": "Task",
        "id": "t1",
        "meta": {"versionId": "2", "profile": ["http://example.org/StructureDefinition/task"]},
        "text": {"status": "generated", "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\">t</div>"},
        "extension": [{"url": "http://example.org/priority", "valueCode": "high"}],
        "status": "ready",
        "_status": {"extension": [{"url": "http://example.org/reason", "valueString": "triaged"}]},
        "code": "X",
        "tag": ["a", "b"],
        "_tag": [null, {"id": "tag-b"}],
        "valueAmount": {"value": 3, "unit": "mg"},
        "note": [
            {"authorString": "Nurse", "text": "first"},
            {"text": "second"}
        ]
    })
}

#[test]
fn test_round_trip_is_stable() {
    let task = Task::from_json(full_task());
    let first = task.to_json();
    let second = Task::from_json(first.clone()).to_json();

    assert_eq!(first, second);
    assert_eq!(first, full_task());
}

#[test]
fn test_text_round_trip() {
    let task = Task::from_json(full_task());
    let text = task.to_json_string().expect("serialize");
    let parsed = Task::from_json_str(&text).expect("parse");
    assert_eq!(parsed, task);
    assert_eq!(parsed.to_json_string().expect("serialize"), text);
}

#[test]
fn test_output_follows_registry_order() {
    let task = Task::builder()
        .add("note", json!({"text": "n"}))
        .set("valueBoolean", true)
        .add("tag", "t")
        .set("code", "X")
        .set("status", "draft")
        .extension(Extension::new(
            "http://example.org/flag",
            ExtensionValue::Boolean(true),
        ))
        .id("t2")
        .build();

    let json = task.to_json();
    assert_eq!(
        keys(&json),
        vec!["resourceType", "id", "extension", "status", "code", "tag", "valueBoolean", "note"]
    );
}

#[test]
fn test_nested_output_is_canonical() {
    let task = Task::from_json(json!({
        "resourceType": "Task",
        "status": "ready",
        "note": [{"text": "t", "authorString": "a", "unknown": 1}]
    }));
    assert_eq!(keys(&task.to_json()["note"][0]), vec!["authorString", "text"]);
}

#[test]
fn test_unset_properties_are_absent() {
    let task = Task::builder().set("status", "draft").build();
    let json = task.to_json();
    assert_eq!(json, json!({"resourceType": "Task", "status": "draft"}));
    assert!(!task.to_json_string().expect("serialize").contains("null"));
}

#[test]
fn test_null_and_unknown_keys_are_dropped_on_bind() {
    let task = Task::from_json(json!({
        "resourceType": "Task",
        "status": "ready",
        "code": null,
        "futureField": {"added": "in a later release"}
    }));
    assert_eq!(task.to_json(), json!({"resourceType": "Task", "status": "ready"}));
}

#[test]
fn test_choice_exclusivity_with_sidecars() {
    let task = Task::builder()
        .set("status", "ready")
        .set_choice("valueString", "pending")
        .set_sidecar("valueString", json!({"id": "vs"}))
        .set_choice("valueAmount", json!({"value": 1, "unit": "mg"}))
        .build();

    let json = task.to_json();
    assert!(json.get("valueString").is_none());
    assert!(json.get("_valueString").is_none());
    assert_eq!(json["valueAmount"], json!({"value": 1, "unit": "mg"}));
    assert_eq!(task.node().choice_type("value"), Some("Amount"));
}

#[test]
fn test_sidecar_on_other_choice_member_switches_selection() {
    let task = Task::builder()
        .set("status", "ready")
        .set_choice("valueBoolean", true)
        .set_sidecar("valueString", json!({"id": "vs"}))
        .build();

    let json = task.to_json();
    assert!(json.get("valueBoolean").is_none());
    assert_eq!(json["_valueString"], json!({"id": "vs"}));
    assert_eq!(Task::from_json(json.clone()).to_json(), json);

    let reason = Extension::new(
        "http://example.org/reason",
        ExtensionValue::String("pending".to_string()),
    );
    let task = Task::builder()
        .set("status", "ready")
        .set_choice("valueString", "x")
        .add_sidecar_extension("valueBoolean", reason)
        .build();

    let json = task.to_json();
    assert!(json.get("valueString").is_none());
    assert_eq!(json["_valueBoolean"]["extension"][0]["valueString"], "pending");
    assert_eq!(Task::from_json(json.clone()).to_json(), json);
}

#[test]
fn test_plain_set_on_choice_member_is_exclusive() {
    let task = Task::builder()
        .set("valueString", "a")
        .set("valueBoolean", false)
        .build();
    assert_eq!(task.node().choice("value"), Some(("valueBoolean", &json!(false))));
    assert!(!task.node().is_set("valueString"));
}

#[test]
fn test_sidecar_pairing() {
    let reason = Extension::new(
        "http://example.org/reason",
        ExtensionValue::String("triaged".to_string()),
    );
    let builder = Task::builder()
        .set("status", "ready")
        .add_sidecar_extension("status", reason);

    let json = builder.build().to_json();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["_status"]["extension"][0]["valueString"], "triaged");
    assert_eq!(keys(&json), vec!["resourceType", "status", "_status"]);

    let cleared = builder.clone().clear("status").build().to_json();
    assert!(cleared.get("status").is_none());
    assert_eq!(cleared["_status"]["extension"][0]["url"], "http://example.org/reason");

    let both_cleared = builder.clear("status").clear_sidecar("status").build();
    assert_eq!(both_cleared.to_json(), json!({"resourceType": "Task"}));
}

#[test]
fn test_sidecar_survives_with_and_transform() {
    let task = Task::from_json(full_task());

    let changed = task.with(json!({"code": "Y"}));
    assert_eq!(changed.to_json()["_status"], full_task()["_status"]);
    assert_eq!(changed.to_json()["_tag"], json!([null, {"id": "tag-b"}]));

    let transformed = task.apply_transform(|snapshot| {
        let mut overlay = serde_json::Map::new();
        if let Some(Value::Array(tags)) = snapshot.get("tag") {
            let mut tags = tags.clone();
            tags.reverse();
            overlay.insert("tag".to_string(), Value::Array(tags));
        }
        overlay
    });
    assert_eq!(transformed.to_json()["tag"], json!(["b", "a"]));
    assert_eq!(transformed.to_json()["_status"], full_task()["_status"]);
}

#[test]
fn test_adding_to_repeating_primitive_keeps_sidecar_aligned() {
    let task = Task::from_json(full_task())
        .to_builder()
        .add("tag", "c")
        .build();
    assert_eq!(task.to_json()["tag"], json!(["a", "b", "c"]));
    assert_eq!(task.to_json()["_tag"], json!([null, {"id": "tag-b"}, null]));
}

#[test]
fn test_adding_after_sidecar_only_array_keeps_positions() {
    let task = Task::from_json(json!({"resourceType": "Task", "_tag": [{"id": "first"}]}))
        .to_builder()
        .add("tag", "b")
        .build();

    let json = task.to_json();
    assert_eq!(json["tag"], json!([null, "b"]));
    assert_eq!(json["_tag"], json!([{"id": "first"}, null]));
    assert_eq!(Task::from_json(json.clone()).to_json(), json);
}

#[test]
fn test_with_returns_new_entity() {
    let original = Task::builder().set("status", "draft").set("code", "A").build();
    let updated = original.with(json!({"code": "B"}));

    assert_eq!(updated.node().get_str("code"), Some("B"));
    assert_eq!(original.node().get_str("code"), Some("A"));
    assert_eq!(updated.node().get_str("status"), Some("draft"));
}

#[test]
fn test_with_choice_change_replaces_member() {
    let original = Task::builder().set("valueString", "x").build();
    let updated = original.with(json!({"valueBoolean": true}));

    assert_eq!(updated.node().choice("value"), Some(("valueBoolean", &json!(true))));
    assert_eq!(original.node().choice("value"), Some(("valueString", &json!("x"))));
}

#[test]
fn test_with_null_clears_key() {
    let original = Task::builder().set("status", "draft").set("code", "A").build();
    let updated = original.with(json!({"code": null}));
    assert!(!updated.node().is_set("code"));
}

#[test]
fn test_with_replaces_nested_values_wholesale() {
    let original = Task::from_json(full_task());
    let updated = original.with(json!({"note": [{"text": "only"}]}));
    assert_eq!(updated.to_json()["note"], json!([{"text": "only"}]));
    assert_eq!(original.to_json()["note"][0]["authorString"], "Nurse");
}

#[test]
fn test_deep_clone_independence() {
    let original = Task::from_json(full_task());
    let copy = original.deep_clone();
    assert_eq!(copy, original);

    let mutated = copy
        .to_builder()
        .add("note", json!({"text": "third"}))
        .add("tag", "z")
        .build();

    assert_eq!(mutated.node().get_array("note").len(), 3);
    assert_eq!(original.node().get_array("note").len(), 2);
    assert_eq!(original.node().get_strings("tag"), vec!["a", "b"]);
    assert_eq!(copy.node().get_strings("tag"), vec!["a", "b"]);
}

#[test]
fn test_builder_chain_scenario() {
    let n1 = json!({"text": "n1"});
    let n2 = json!({"text": "n2"});

    let json = Task::builder()
        .set("code", "X")
        .add("note", n1.clone())
        .add("note", n2.clone())
        .build()
        .to_json();

    assert_eq!(json["code"], "X");
    assert_eq!(json["note"], json!([n1, n2]));
}

#[test]
fn test_typed_nested_access() {
    let task = Task::from_json(full_task());
    let notes: Vec<Remark> = task.node().get_all("note");
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].node().choice_type("author"), Some("String"));
    assert_eq!(notes[1].node().get_str("text"), Some("second"));

    let priority = task
        .node()
        .extension_by_url("http://example.org/priority")
        .and_then(|ext| ext.value());
    assert_eq!(priority, Some(ExtensionValue::Code("high".to_string())));
}

#[test]
fn test_contained_resources() {
    let inner = Task::builder().id("inner").set("status", "draft").build();
    let outer = Task::builder()
        .set("status", "ready")
        .contained(&inner)
        .set("code", "outer")
        .build();

    assert_eq!(
        outer.to_json()["contained"],
        json!([{"resourceType": "Task", "id": "inner", "status": "draft"}])
    );
    let contained: Vec<Task> = outer.contained();
    assert_eq!(contained, vec![inner]);
}

#[test]
fn test_resource_type_mismatch_is_rejected() {
    let err = Task::from_json_str(r#"{"resourceType": "Patient", "status": "x"}"#)
        .expect_err("mismatch");
    assert!(matches!(
        err,
        Error::ResourceTypeMismatch { ref expected, ref found } if expected == "Task" && found == "Patient"
    ));
    assert!(matches!(Task::from_json_str("[1]"), Err(Error::ExpectedObject)));
}

#[test]
fn test_bind_resource_through_catalog() {
    let catalog = StaticCatalog::new(FhirVersion::R4, vec![&TASK]);
    let node = Node::bind_resource(&catalog, full_task()).expect("bind");
    assert_eq!(node.type_name(), "Task");
    assert_eq!(node.to_json(), full_task());

    assert!(matches!(
        Node::bind_resource(&catalog, json!({"resourceType": "Patient"})),
        Err(Error::UnknownResourceType(name)) if name == "Patient"
    ));
    assert!(matches!(
        Node::bind_resource(&catalog, json!({"status": "ready"})),
        Err(Error::MissingResourceType)
    ));
}

#[test]
fn test_entities_nest_in_serde_structs() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Envelope {
        label: String,
        task: Task,
    }

    let envelope = Envelope {
        label: "batch-1".to_string(),
        task: Task::builder().set("code", "X").set("status", "draft").build(),
    };
    let text = serde_json::to_string(&envelope).expect("serialize");
    assert_eq!(
        text,
        r#"{"label":"batch-1","task":{"resourceType":"Task","status":"draft","code":"X"}}"#
    );

    let back: Envelope = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back.task, envelope.task);
}

struct RejectingValidator;

#[async_trait]
impl Validator for RejectingValidator {
    async fn validate(&self, resource: &Value) -> ValidationOutcome {
        ValidationOutcome::from_issues(
            resource["resourceType"].as_str().map(str::to_string),
            vec![ValidationIssue::error(
                IssueCode::Invariant,
                "rejected by policy".to_string(),
            )],
        )
    }
}

fn cardinality_validator() -> CardinalityValidator {
    let catalog = Arc::new(StaticCatalog::new(FhirVersion::R4, vec![&TASK]));
    CardinalityValidator::from_config(&ValidatorConfig::default(), catalog).expect("valid config")
}

#[tokio::test]
async fn test_validation_gate_rejects_missing_required_field() {
    let builder = Task::builder().set("code", "X");
    let validator = cardinality_validator();

    let err = builder
        .build_and_validate(&validator)
        .await
        .expect_err("status is required");
    match &err {
        Error::Validation { resource_type, issues } => {
            assert_eq!(resource_type, "Task");
            assert!(issues
                .iter()
                .any(|issue| issue.location.as_deref() == Some("Task.status")));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!err.validation_issues().is_empty());

    let unvalidated = builder.build();
    assert_eq!(unvalidated.node().get_str("code"), Some("X"));
}

#[tokio::test]
async fn test_validation_gate_reports_nested_paths() {
    let validator = cardinality_validator();
    let err = Task::builder()
        .set("status", "ready")
        .add("note", json!({"text": "ok"}))
        .add("note", json!({"authorString": "me"}))
        .build_and_validate(&validator)
        .await
        .expect_err("note.text is required");

    let locations: Vec<&str> = err
        .validation_issues()
        .iter()
        .filter_map(|issue| issue.location.as_deref())
        .collect();
    assert_eq!(locations, vec!["Task.note[1].text"]);
}

#[tokio::test]
async fn test_validation_gate_passes_valid_entity() {
    let validator = cardinality_validator();
    let task = Task::builder()
        .set("status", "ready")
        .set("code", "X")
        .build_and_validate(&validator)
        .await
        .expect("valid");
    assert_eq!(task.node().get_str("status"), Some("ready"));
}

#[tokio::test]
async fn test_validator_verdict_is_forwarded() {
    let err = Task::builder()
        .set("status", "ready")
        .build_and_validate(&RejectingValidator)
        .await
        .expect_err("rejected");
    assert_eq!(err.validation_issues()[0].diagnostics, "rejected by policy");
}
