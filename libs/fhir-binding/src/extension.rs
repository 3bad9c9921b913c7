//! Element-level data types: Extension, Meta and Narrative
//!
//! These are the types the base slots of every element and resource refer to, so
//! they live next to the engine rather than with the generated models.

use serde_json::{Number, Value};

use crate::entity::Entity;
use crate::fhir_entity;
use crate::registry::{choice_member_name, choice_type_suffix, EntityKind, PropertyDef, PropertyRegistry};

const EXTENSION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("url").required().without_sidecar(),
    PropertyDef::primitive("valueBase64Binary").choice_of("value"),
    PropertyDef::primitive("valueBoolean").choice_of("value"),
    PropertyDef::primitive("valueCanonical").choice_of("value"),
    PropertyDef::primitive("valueCode").choice_of("value"),
    PropertyDef::primitive("valueDate").choice_of("value"),
    PropertyDef::primitive("valueDateTime").choice_of("value"),
    PropertyDef::primitive("valueDecimal").choice_of("value"),
    PropertyDef::primitive("valueId").choice_of("value"),
    PropertyDef::primitive("valueInstant").choice_of("value"),
    PropertyDef::primitive("valueInteger").choice_of("value"),
    PropertyDef::primitive("valueMarkdown").choice_of("value"),
    PropertyDef::primitive("valueOid").choice_of("value"),
    PropertyDef::primitive("valuePositiveInt").choice_of("value"),
    PropertyDef::primitive("valueString").choice_of("value"),
    PropertyDef::primitive("valueTime").choice_of("value"),
    PropertyDef::primitive("valueUnsignedInt").choice_of("value"),
    PropertyDef::primitive("valueUri").choice_of("value"),
    PropertyDef::primitive("valueUrl").choice_of("value"),
    PropertyDef::primitive("valueUuid").choice_of("value"),
    PropertyDef::opaque("valueAddress").choice_of("value"),
    PropertyDef::opaque("valueAge").choice_of("value"),
    PropertyDef::opaque("valueAnnotation").choice_of("value"),
    PropertyDef::opaque("valueAttachment").choice_of("value"),
    PropertyDef::opaque("valueCodeableConcept").choice_of("value"),
    PropertyDef::opaque("valueCoding").choice_of("value"),
    PropertyDef::opaque("valueContactPoint").choice_of("value"),
    PropertyDef::opaque("valueCount").choice_of("value"),
    PropertyDef::opaque("valueDistance").choice_of("value"),
    PropertyDef::opaque("valueDuration").choice_of("value"),
    PropertyDef::opaque("valueHumanName").choice_of("value"),
    PropertyDef::opaque("valueIdentifier").choice_of("value"),
    PropertyDef::opaque("valueMoney").choice_of("value"),
    PropertyDef::opaque("valuePeriod").choice_of("value"),
    PropertyDef::opaque("valueQuantity").choice_of("value"),
    PropertyDef::opaque("valueRange").choice_of("value"),
    PropertyDef::opaque("valueRatio").choice_of("value"),
    PropertyDef::opaque("valueReference").choice_of("value"),
    PropertyDef::opaque("valueSampledData").choice_of("value"),
    PropertyDef::opaque("valueSignature").choice_of("value"),
    PropertyDef::opaque("valueTiming").choice_of("value"),
    PropertyDef::opaque("valueContactDetail").choice_of("value"),
    PropertyDef::opaque("valueContributor").choice_of("value"),
    PropertyDef::opaque("valueDataRequirement").choice_of("value"),
    PropertyDef::opaque("valueExpression").choice_of("value"),
    PropertyDef::opaque("valueParameterDefinition").choice_of("value"),
    PropertyDef::opaque("valueRelatedArtifact").choice_of("value"),
    PropertyDef::opaque("valueTriggerDefinition").choice_of("value"),
    PropertyDef::opaque("valueUsageContext").choice_of("value"),
    PropertyDef::opaque("valueDosage").choice_of("value"),
    PropertyDef::complex("valueMeta", meta_registry).choice_of("value"),
];

pub static EXTENSION: PropertyRegistry =
    PropertyRegistry::new("Extension", EntityKind::DataType, EXTENSION_PROPERTIES);

const META_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("versionId"),
    PropertyDef::primitive("lastUpdated"),
    PropertyDef::primitive("source"),
    PropertyDef::primitive("profile").many(),
    PropertyDef::opaque("security").many(),
    PropertyDef::opaque("tag").many(),
];

pub static META: PropertyRegistry =
    PropertyRegistry::new("Meta", EntityKind::DataType, META_PROPERTIES);

const NARRATIVE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("status").required(),
    PropertyDef::primitive("div").required().without_sidecar(),
];

pub static NARRATIVE: PropertyRegistry =
    PropertyRegistry::new("Narrative", EntityKind::DataType, NARRATIVE_PROPERTIES);

pub(crate) fn extension_registry() -> &'static PropertyRegistry {
    &EXTENSION
}

pub(crate) fn meta_registry() -> &'static PropertyRegistry {
    &META
}

pub(crate) fn narrative_registry() -> &'static PropertyRegistry {
    &NARRATIVE
}

fhir_entity! {
    /// Additional content defined by implementations, keyed by `url`
    pub struct Extension => EXTENSION;
    pub builder ExtensionBuilder;
}

fhir_entity! {
    /// Metadata about a resource
    pub struct Meta => META;
    pub builder MetaBuilder;
}

fhir_entity! {
    /// Human-readable summary of a resource
    pub struct Narrative => NARRATIVE;
    pub builder NarrativeBuilder;
}

/// Typed view of `Extension.value[x]`
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionValue {
    Boolean(bool),
    Integer(i64),
    Decimal(Number),
    String(String),
    Code(String),
    Uri(String),
    DateTime(String),
    /// Any other member of the closed `value[x]` set, keyed by its type code
    /// (`Quantity`, `Date`, `CodeableConcept`, ...)
    Other { type_code: String, value: Value },
}

impl ExtensionValue {
    /// Type code of the member this value occupies
    pub fn type_code(&self) -> &str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Decimal(_) => "Decimal",
            Self::String(_) => "String",
            Self::Code(_) => "Code",
            Self::Uri(_) => "Uri",
            Self::DateTime(_) => "DateTime",
            Self::Other { type_code, .. } => type_code,
        }
    }

    /// Concrete property name (`valueString`, `valueQuantity`, ...)
    pub fn property_name(&self) -> String {
        choice_member_name("value", self.type_code())
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(b),
            Self::Integer(i) => Value::from(i),
            Self::Decimal(n) => Value::Number(n),
            Self::String(s) | Self::Code(s) | Self::Uri(s) | Self::DateTime(s) => Value::String(s),
            Self::Other { value, .. } => value,
        }
    }

    fn from_member(type_code: &str, value: &Value) -> Self {
        match (type_code, value) {
            ("Boolean", Value::Bool(b)) => Self::Boolean(*b),
            ("Integer", Value::Number(n)) if n.is_i64() => Self::Integer(n.as_i64().unwrap_or_default()),
            ("Decimal", Value::Number(n)) => Self::Decimal(n.clone()),
            ("String", Value::String(s)) => Self::String(s.clone()),
            ("Code", Value::String(s)) => Self::Code(s.clone()),
            ("Uri", Value::String(s)) => Self::Uri(s.clone()),
            ("DateTime", Value::String(s)) => Self::DateTime(s.clone()),
            (other, value) => Self::Other {
                type_code: other.to_string(),
                value: value.clone(),
            },
        }
    }
}

impl Extension {
    /// Extension carrying a single value
    pub fn new(url: impl Into<String>, value: ExtensionValue) -> Self {
        let name = value.property_name();
        Self::builder()
            .set("url", url.into())
            .set_choice(&name, value.into_value())
            .build()
    }

    /// Complex extension made of nested extensions only
    pub fn nested(url: impl Into<String>, extensions: impl IntoIterator<Item = Extension>) -> Self {
        extensions
            .into_iter()
            .fold(Self::builder().set("url", url.into()), |builder, extension| {
                builder.extension(extension)
            })
            .build()
    }

    pub fn url(&self) -> Option<&str> {
        self.node().get_str("url")
    }

    pub fn value(&self) -> Option<ExtensionValue> {
        let (name, value) = self.node().choice("value")?;
        let type_code = choice_type_suffix("value", name)?;
        Some(ExtensionValue::from_member(type_code, value))
    }

    /// Sub-extensions of a complex extension
    pub fn extensions(&self) -> Vec<Extension> {
        self.node().extensions()
    }
}

impl Meta {
    pub fn version_id(&self) -> Option<&str> {
        self.node().get_str("versionId")
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.node().get_str("lastUpdated")
    }

    pub fn profiles(&self) -> Vec<&str> {
        self.node().get_strings("profile")
    }
}

impl MetaBuilder {
    pub fn version_id(self, version_id: impl Into<String>) -> Self {
        self.set("versionId", version_id.into())
    }

    pub fn last_updated(self, instant: impl Into<String>) -> Self {
        self.set("lastUpdated", instant.into())
    }

    pub fn profile(self, canonical: impl Into<String>) -> Self {
        self.add("profile", canonical.into())
    }
}

impl Narrative {
    pub fn status(&self) -> Option<&str> {
        self.node().get_str("status")
    }

    pub fn div(&self) -> Option<&str> {
        self.node().get_str("div")
    }
}

impl NarrativeBuilder {
    pub fn status(self, status: impl Into<String>) -> Self {
        self.set("status", status.into())
    }

    pub fn div(self, xhtml: impl Into<String>) -> Self {
        self.set("div", xhtml.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extension_new() {
        let ext = Extension::new(
            "http://example.org/birthPlace",
            ExtensionValue::String("Berlin".to_string()),
        );
        assert_eq!(
            ext.to_json(),
            json!({"url": "http://example.org/birthPlace", "valueString": "Berlin"})
        );
        assert_eq!(ext.value(), Some(ExtensionValue::String("Berlin".to_string())));
    }

    #[test]
    fn test_extension_value_is_exclusive() {
        let ext = Extension::builder()
            .set("url", "http://example.org/x")
            .set("valueString", "a")
            .set("valueInteger", 3)
            .build();
        assert_eq!(ext.value(), Some(ExtensionValue::Integer(3)));
        assert!(ext.to_json().get("valueString").is_none());
    }

    #[test]
    fn test_complex_value_is_tagged() {
        let ext = Extension::from_json(json!({
            "url": "http://example.org/q",
            "valueQuantity": {"value": 5, "unit": "mg"}
        }));
        match ext.value() {
            Some(ExtensionValue::Other { type_code, value }) => {
                assert_eq!(type_code, "Quantity");
                assert_eq!(value["unit"], "mg");
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_nested_extension() {
        let ext = Extension::nested(
            "http://example.org/complex",
            vec![
                Extension::new("part-a", ExtensionValue::Code("a".to_string())),
                Extension::new("part-b", ExtensionValue::Boolean(false)),
            ],
        );
        let json = ext.to_json();
        assert_eq!(json["extension"][0]["url"], "part-a");
        assert_eq!(json["extension"][1]["valueBoolean"], false);
        assert_eq!(json["url"], "http://example.org/complex");
        assert!(ext.value().is_none());
        assert_eq!(ext.extensions().len(), 2);
    }

    #[test]
    fn test_meta_builder() {
        let meta = Meta::builder()
            .profile("http://example.org/StructureDefinition/a")
            .version_id("3")
            .build();
        assert_eq!(
            meta.to_json(),
            json!({"versionId": "3", "profile": ["http://example.org/StructureDefinition/a"]})
        );
        assert_eq!(meta.profiles(), vec!["http://example.org/StructureDefinition/a"]);
    }
}
