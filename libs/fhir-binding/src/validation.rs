//! Validation boundary
//!
//! The binding layer does not validate. `build_and_validate` hands the built
//! resource to a [`Validator`] and forwards its verdict. The outcome and issue types
//! follow the OperationOutcome shape used across ferrum.
//!
//! [`CardinalityValidator`] is a structural validator driven purely by registry
//! cardinality (required properties, single vs repeating values, required choice
//! groups). It carries no profile, invariant or terminology rules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::catalog::SchemaCatalog;
use crate::error::{Error, Result};
use crate::codec::is_empty_metadata;
use crate::registry::{sidecar_name, PropertyDef, PropertyRegistry};

/// External validation collaborator
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, resource: &Value) -> ValidationOutcome;
}

/// Verdict for one resource
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub resource_type: Option<String>,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    /// The resource is valid unless some issue is an error or fatal
    pub fn from_issues(resource_type: Option<String>, issues: Vec<ValidationIssue>) -> Self {
        let valid = !issues.iter().any(ValidationIssue::is_error);
        Self {
            resource_type,
            valid,
            issues,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// Errors and fatal issues
    pub fn error_count(&self) -> usize {
        self.count(IssueSeverity::Fatal) + self.count(IssueSeverity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(IssueSeverity::Warning)
    }

    /// The issues as an `OperationOutcome` resource
    pub fn to_operation_outcome(&self) -> Value {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues,
        })
    }
}

/// One `OperationOutcome.issue`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub diagnostics: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_location"
    )]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Vec<String>>,
}

impl ValidationIssue {
    pub fn new(severity: IssueSeverity, code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            diagnostics: diagnostics.into(),
            location: None,
            expression: None,
        }
    }

    pub fn error(code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, diagnostics)
    }

    pub fn warning(code: IssueCode, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, code, diagnostics)
    }

    /// Attach the element path as both location and expression
    pub fn at(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.expression = Some(vec![path.clone()]);
        self.location = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, IssueSeverity::Error | IssueSeverity::Fatal)
    }
}

// `location` is a list in OperationOutcome; this layer only ever reports one.
fn serialize_location<S: serde::Serializer>(
    location: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    location
        .as_ref()
        .map(std::slice::from_ref)
        .serialize(serializer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

/// Issue types from the FHIR `issue-type` value set that this layer reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    Invalid,
    Structure,
    Required,
    Value,
    Invariant,
    NotSupported,
    Processing,
    TooCostly,
}

/// Settings for [`CardinalityValidator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Stop at the first error
    pub fail_fast: bool,
    /// Stop collecting once this many issues were reported
    pub max_issues: usize,
    /// Descend into nested elements that have a registry
    pub check_nested: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_issues: 1000,
            check_nested: true,
        }
    }
}

impl ValidatorConfig {
    pub fn compile(&self) -> Result<ValidationPlan> {
        if self.max_issues == 0 {
            return Err(Error::InvalidConfig(
                "max_issues must be greater than zero".to_string(),
            ));
        }

        Ok(ValidationPlan {
            fail_fast: self.fail_fast,
            max_issues: self.max_issues,
            check_nested: self.check_nested,
        })
    }
}

/// Compiled settings
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    pub fail_fast: bool,
    pub max_issues: usize,
    pub check_nested: bool,
}

/// Registry-driven cardinality checks
pub struct CardinalityValidator {
    plan: ValidationPlan,
    catalog: Arc<dyn SchemaCatalog>,
}

impl CardinalityValidator {
    pub fn new(plan: ValidationPlan, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { plan, catalog }
    }

    pub fn from_config(config: &ValidatorConfig, catalog: Arc<dyn SchemaCatalog>) -> Result<Self> {
        Ok(Self::new(config.compile()?, catalog))
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    /// Synchronous entry point; [`Validator::validate`] delegates here
    pub fn check(&self, resource: &Value) -> ValidationOutcome {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(object) = resource.as_object() else {
            return ValidationOutcome::from_issues(
                None,
                vec![ValidationIssue::error(
                    IssueCode::Structure,
                    "resource must be a JSON object",
                )],
            );
        };

        let Some(ref type_name) = resource_type else {
            return ValidationOutcome::from_issues(
                None,
                vec![ValidationIssue::error(
                    IssueCode::Structure,
                    "resource has no resourceType",
                )],
            );
        };

        let Some(registry) = self.catalog.registry(type_name) else {
            return ValidationOutcome::from_issues(
                resource_type.clone(),
                vec![ValidationIssue::error(
                    IssueCode::NotSupported,
                    format!(
                        "resource type {} is not known to the {} catalog",
                        type_name,
                        self.catalog.version()
                    ),
                )
                .at(type_name.as_str())],
            );
        };

        let mut run = CardinalityRun {
            plan: &self.plan,
            issues: Vec::new(),
        };
        run.check_object(registry, object, type_name);

        let outcome = ValidationOutcome::from_issues(Some(type_name.clone()), run.issues);
        tracing::debug!(
            resource_type = %type_name,
            valid = outcome.valid,
            issues = outcome.issues.len(),
            "cardinality validation finished"
        );
        outcome
    }
}

#[async_trait]
impl Validator for CardinalityValidator {
    async fn validate(&self, resource: &Value) -> ValidationOutcome {
        self.check(resource)
    }
}

struct CardinalityRun<'a> {
    plan: &'a ValidationPlan,
    issues: Vec<ValidationIssue>,
}

impl CardinalityRun<'_> {
    fn stopped(&self) -> bool {
        (self.plan.fail_fast && self.issues.iter().any(ValidationIssue::is_error))
            || self.issues.len() >= self.plan.max_issues
    }

    fn report(&mut self, issue: ValidationIssue) {
        if !self.stopped() {
            self.issues.push(issue);
        }
    }

    fn check_object(
        &mut self,
        registry: &'static PropertyRegistry,
        object: &Map<String, Value>,
        path: &str,
    ) {
        for property in registry.properties() {
            if self.stopped() {
                return;
            }
            if property.choice_of.is_some() {
                continue;
            }
            self.check_property(property, object, path);
        }

        for group in registry.choice_groups() {
            if self.stopped() {
                return;
            }
            let members: Vec<&PropertyDef> = registry.choice_group(group).collect();
            let required = members.iter().any(|member| member.min > 0);
            let present: Vec<&PropertyDef> = members
                .iter()
                .copied()
                .filter(|member| is_present(object, member.name))
                .collect();

            if required && present.is_empty() {
                let location = format!("{}.{}[x]", path, group);
                self.report(
                    ValidationIssue::error(
                        IssueCode::Required,
                        format!("{}: minimum required = 1, but only found 0", location),
                    )
                    .at(location),
                );
            }
            if present.len() > 1 {
                let location = format!("{}.{}[x]", path, group);
                self.report(
                    ValidationIssue::error(
                        IssueCode::Structure,
                        format!("{}: more than one choice member present", location),
                    )
                    .at(location),
                );
            }
            for member in present {
                self.check_nested(member, object, path);
            }
        }
    }

    fn check_property(&mut self, property: &PropertyDef, object: &Map<String, Value>, path: &str) {
        let location = format!("{}.{}", path, property.name);
        let value = object.get(property.name).filter(|value| !value.is_null());

        let count = match value {
            Some(Value::Array(items)) => items.len(),
            Some(_) => 1,
            None if is_present(object, property.name) => 1,
            None => 0,
        };

        if (count as u64) < u64::from(property.min) {
            self.report(
                ValidationIssue::error(
                    IssueCode::Required,
                    format!(
                        "{}: minimum required = {}, but only found {}",
                        location, property.min, count
                    ),
                )
                .at(location.as_str()),
            );
        }

        match value {
            Some(Value::Array(_)) if !property.repeats => self.report(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("{}: must be a single value, found an array", location),
                )
                .at(location.as_str()),
            ),
            Some(value) if property.repeats && !value.is_array() => self.report(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!("{}: must be an array", location),
                )
                .at(location.as_str()),
            ),
            _ => {}
        }

        self.check_nested(property, object, path);
    }

    fn check_nested(&mut self, property: &PropertyDef, object: &Map<String, Value>, path: &str) {
        if !self.plan.check_nested {
            return;
        }
        let Some(registry) = property.nested_registry() else {
            return;
        };

        match object.get(property.name) {
            Some(Value::Object(nested)) => {
                let location = format!("{}.{}", path, property.name);
                self.check_object(registry, nested, &location);
            }
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Object(nested) = item {
                        let location = format!("{}.{}[{}]", path, property.name, index);
                        self.check_object(registry, nested, &location);
                    }
                }
            }
            _ => {}
        }
    }
}

/// A primitive counts as present when its value is set or its sidecar carries metadata
fn is_present(object: &Map<String, Value>, name: &str) -> bool {
    object.get(name).is_some_and(|value| !value.is_null())
        || object
            .get(&sidecar_name(name))
            .is_some_and(|metadata| !is_empty_metadata(metadata))
}
