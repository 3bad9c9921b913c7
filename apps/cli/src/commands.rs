//! Subcommand implementations

use anyhow::{Context, Result};
use ferrum_binding::{
    CardinalityValidator, Node, SchemaCatalog, ValidationOutcome, Validator, ValidatorConfig,
};
use ferrum_models::R4Catalog;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::CliConfig;

/// Read a JSON document from a file, or from stdin when `input` is `-`
pub fn read_input(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("reading {}", input))?
    };

    serde_json::from_str(&text).with_context(|| format!("parsing JSON from {}", input))
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, format!("{}\n", text))
            .with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn render(value: &impl serde::Serialize, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

/// Bind a resource by its `resourceType` and render it in canonical order
pub fn canonical_text(resource: Value, pretty: bool) -> Result<String> {
    let node = Node::bind_resource(&R4Catalog, resource).context("binding resource")?;
    tracing::debug!(resource_type = node.type_name(), "bound resource");
    render(&node, pretty)
}

pub async fn check(resource: &Value, config: &ValidatorConfig) -> Result<ValidationOutcome> {
    let validator = CardinalityValidator::from_config(config, Arc::new(R4Catalog))
        .context("building validator")?;
    Ok(validator.validate(resource).await)
}

pub fn canonicalize(
    config: &CliConfig,
    input: &str,
    pretty: bool,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let resource = read_input(input)?;
    let text = canonical_text(resource, pretty || config.output.pretty)?;
    write_output(&text, output)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn validate(
    config: &CliConfig,
    input: &str,
    fail_fast: bool,
    pretty: bool,
) -> Result<ExitCode> {
    let resource = read_input(input)?;

    let mut validation = config.validation.clone();
    validation.fail_fast |= fail_fast;

    let outcome = check(&resource, &validation).await?;
    tracing::info!(
        resource_type = outcome.resource_type.as_deref().unwrap_or("<none>"),
        errors = outcome.error_count(),
        warnings = outcome.warning_count(),
        "validation finished"
    );

    let text = render(&outcome.to_operation_outcome(), pretty || config.output.pretty)?;
    write_output(&text, None)?;

    Ok(if outcome.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn types() -> Result<ExitCode> {
    let catalog = R4Catalog;
    println!("FHIR {} ({})", catalog.version(), catalog.version().release());
    for resource_type in catalog.resource_types() {
        println!("  {}", resource_type);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_text_reorders_and_drops_unknown() {
        let text = canonical_text(
            json!({
                "gender": "female",
                "unknownField": 1,
                "id": "p1",
                "resourceType": "Patient"
            }),
            false,
        )
        .unwrap();
        assert_eq!(text, r#"{"resourceType":"Patient","id":"p1","gender":"female"}"#);
    }

    #[test]
    fn test_canonical_text_rejects_unknown_type() {
        let err = canonical_text(json!({"resourceType": "Basic"}), false).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown resource type: Basic"));
    }

    #[tokio::test]
    async fn test_check_reports_missing_fields() {
        let outcome = check(
            &json!({"resourceType": "Observation", "status": "final"}),
            &ValidatorConfig::default(),
        )
        .await
        .unwrap();
        assert!(!outcome.valid);
        assert_eq!(
            outcome.to_operation_outcome()["issue"][0]["location"][0],
            "Observation.code"
        );
    }

    #[tokio::test]
    async fn test_check_rejects_bad_config() {
        let config = ValidatorConfig {
            max_issues: 0,
            ..ValidatorConfig::default()
        };
        assert!(check(&json!({"resourceType": "Patient"}), &config).await.is_err());
    }
}
