use ferrum_binding::{
    CardinalityValidator, Entity, Error as BindingError, Node, SchemaCatalog, ValidatorConfig,
};
use ferrum_models::{
    Bundle, BundleType, Deceased, Observation, ObservationValue, Patient, R4Catalog,
};
use serde_json::Value;
use std::{fs, path::PathBuf, sync::Arc};

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

fn load_fixture(relative: &str) -> Value {
    let path = fixtures_root().join(relative);
    assert!(path.exists(), "fixture missing at {:?}", path);

    let text = fs::read_to_string(&path).expect("failed to read fixture");
    serde_json::from_str(&text).expect("failed to parse fixture")
}

/// Compact text of a fixture, keeping its key order
fn canonical_text(value: &Value) -> String {
    serde_json::to_string(value).expect("fixture should serialize")
}

fn validator() -> CardinalityValidator {
    CardinalityValidator::from_config(&ValidatorConfig::default(), Arc::new(R4Catalog))
        .expect("default config compiles")
}

#[test]
fn patient_example_round_trips_in_canonical_order() {
    let fixture = load_fixture("patient-example.json");
    let patient = Patient::from_json(fixture.clone());

    assert_eq!(patient.to_json(), fixture);
    assert_eq!(
        patient.to_json_string().expect("serialize"),
        canonical_text(&fixture)
    );
    assert_eq!(Patient::from_json(patient.to_json()), patient);
}

#[test]
fn patient_example_accessors() {
    let patient = Patient::from_json(load_fixture("patient-example.json"));

    assert_eq!(patient.id(), Some("example"));
    assert_eq!(patient.active(), Some(true));
    assert_eq!(patient.official_name().as_deref(), Some("Peter James Chalmers"));
    assert_eq!(patient.deceased(), Some(Deceased::Boolean(false)));
    assert_eq!(
        patient.identifier_value("urn:oid:1.2.36.146.595.217.0.1").as_deref(),
        Some("12345")
    );
    assert_eq!(patient.telecom()[1].rank(), Some(1));
    assert_eq!(patient.addresses()[0].city(), Some("PleasantVille"));
    assert_eq!(
        patient
            .managing_organization()
            .and_then(|org| org.target_type().map(str::to_string))
            .as_deref(),
        Some("Organization")
    );

    let birth_time = patient
        .node()
        .sidecar("birthDate")
        .and_then(|meta| meta["extension"][0]["valueDateTime"].as_str());
    assert_eq!(birth_time, Some("1974-12-25T14:35:45-05:00"));
}

#[test]
fn patient_sidecars_survive_updates() {
    let fixture = load_fixture("patient-example.json");
    let patient = Patient::from_json(fixture.clone());

    let updated = patient.with(serde_json::json!({"gender": "other", "deceasedDateTime": "2020-01-01"}));
    let json = updated.to_json();

    assert_eq!(json["_birthDate"], fixture["_birthDate"]);
    assert_eq!(json["contact"][0]["name"]["_family"], fixture["contact"][0]["name"]["_family"]);
    assert!(json.get("deceasedBoolean").is_none());
    assert_eq!(updated.deceased(), Some(Deceased::DateTime("2020-01-01".to_string())));
    assert_eq!(patient.to_json(), fixture);
}

#[test]
fn observation_example_round_trips_in_canonical_order() {
    let fixture = load_fixture("observation-bp.json");
    let observation = Observation::from_json(fixture.clone());

    assert_eq!(
        observation.to_json_string().expect("serialize"),
        canonical_text(&fixture)
    );
}

#[test]
fn observation_example_components() {
    let observation = Observation::from_json(load_fixture("observation-bp.json"));

    assert_eq!(observation.status(), Some("final"));
    assert!(observation.value().is_none());
    assert_eq!(observation.components().len(), 2);

    let systolic = observation
        .component("http://loinc.org", "8480-6")
        .expect("systolic component");
    match systolic.value() {
        Some(ObservationValue::Quantity(quantity)) => {
            assert_eq!(quantity.value(), Some(107.0));
            assert_eq!(quantity.code(), Some("mm[Hg]"));
        }
        other => panic!("unexpected value: {:?}", other),
    }
    assert_eq!(
        systolic.interpretations()[0].text(),
        Some("Normal")
    );
}

#[test]
fn bundle_example_entries() {
    let fixture = load_fixture("bundle-transaction.json");
    let bundle = Bundle::from_json(fixture.clone());

    assert_eq!(bundle.to_json_string().expect("serialize"), canonical_text(&fixture));
    assert!(bundle.is_transaction());
    assert_eq!(bundle.bundle_type(), Some(BundleType::Transaction));
    assert_eq!(bundle.entry_count(), 3);

    let requests: Vec<(String, String)> = bundle
        .entries()
        .iter()
        .filter_map(|entry| entry.request())
        .map(|request| {
            (
                request.method().unwrap_or_default().to_string(),
                request.url().unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        requests,
        vec![
            ("POST".to_string(), "Patient".to_string()),
            ("POST".to_string(), "Observation".to_string()),
            ("DELETE".to_string(), "Patient/234".to_string()),
        ]
    );

    let patients: Vec<Patient> = bundle.resources_of();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].official_name().as_deref(), Some("Peter James Chalmers"));
}

#[test]
fn bundle_resources_bind_through_catalog() {
    let bundle = Bundle::from_json(load_fixture("bundle-transaction.json"));
    let nodes = bundle.bind_resources(&R4Catalog);

    let types: Vec<&str> = nodes.iter().map(Node::type_name).collect();
    assert_eq!(types, vec!["Patient", "Observation"]);
    assert_eq!(nodes[1].to_json()["valueQuantity"]["code"], "[lb_av]");
}

#[test]
fn catalog_binds_any_known_resource() {
    let catalog = R4Catalog;
    for fixture in ["patient-example.json", "observation-bp.json", "bundle-transaction.json"] {
        let value = load_fixture(fixture);
        let node = Node::bind_resource(&catalog, value.clone()).expect("known resource type");
        assert_eq!(node.to_json(), value, "{} should round-trip", fixture);
    }

    let unknown = Node::bind_resource(&catalog, serde_json::json!({"resourceType": "Basic"}));
    assert!(matches!(unknown, Err(BindingError::UnknownResourceType(name)) if name == "Basic"));
    assert!(catalog.resource_types().contains(&"Patient"));
}

#[tokio::test]
async fn fixtures_pass_cardinality_validation() {
    let validator = validator();
    for fixture in ["patient-example.json", "observation-bp.json", "bundle-transaction.json"] {
        let outcome = validator.check(&load_fixture(fixture));
        assert!(outcome.valid, "{}: {:?}", fixture, outcome.issues);
    }
}

#[tokio::test]
async fn observation_builder_requires_status_and_code() {
    let validator = validator();
    let builder = Observation::builder().value(ObservationValue::Boolean(true));

    let err = builder
        .build_and_validate(&validator)
        .await
        .expect_err("status and code are required");
    let locations: Vec<&str> = err
        .validation_issues()
        .iter()
        .filter_map(|issue| issue.location.as_deref())
        .collect();
    assert_eq!(locations, vec!["Observation.status", "Observation.code"]);

    let observation = builder
        .status("final")
        .code(ferrum_models::CodeableConcept::from_text("Smoker"))
        .build_and_validate(&validator)
        .await
        .expect("complete observation validates");
    assert_eq!(observation.value(), Some(ObservationValue::Boolean(true)));
}
