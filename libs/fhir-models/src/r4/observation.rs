//! R4 Observation
//!
//! `value[x]` and `effective[x]` are exposed as closed enums over the allowed
//! shapes. Members without a model type here (`Timing`, `Ratio`, `SampledData`)
//! carry the raw element.

use ferrum_binding::{fhir_entity, Entity, EntityKind, Node, PropertyDef, PropertyRegistry, Value};

use super::datatypes::{
    annotation_registry, codeable_concept_registry, identifier_registry, period_registry,
    quantity_registry, range_registry, reference_registry, Annotation, CodeableConcept,
    Identifier, Period, Quantity, Range, Reference,
};

const REFERENCE_RANGE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("low", quantity_registry),
    PropertyDef::complex("high", quantity_registry),
    PropertyDef::complex("type", codeable_concept_registry),
    PropertyDef::complex("appliesTo", codeable_concept_registry).many(),
    PropertyDef::complex("age", range_registry),
    PropertyDef::primitive("text"),
];

pub static OBSERVATION_REFERENCE_RANGE: PropertyRegistry = PropertyRegistry::new(
    "ObservationReferenceRange",
    EntityKind::Backbone,
    REFERENCE_RANGE_PROPERTIES,
);

const COMPONENT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("code", codeable_concept_registry).required(),
    PropertyDef::complex("valueQuantity", quantity_registry).choice_of("value"),
    PropertyDef::complex("valueCodeableConcept", codeable_concept_registry).choice_of("value"),
    PropertyDef::primitive("valueString").choice_of("value"),
    PropertyDef::primitive("valueBoolean").choice_of("value"),
    PropertyDef::primitive("valueInteger").choice_of("value"),
    PropertyDef::complex("valueRange", range_registry).choice_of("value"),
    PropertyDef::opaque("valueRatio").choice_of("value"),
    PropertyDef::opaque("valueSampledData").choice_of("value"),
    PropertyDef::primitive("valueTime").choice_of("value"),
    PropertyDef::primitive("valueDateTime").choice_of("value"),
    PropertyDef::complex("valuePeriod", period_registry).choice_of("value"),
    PropertyDef::complex("dataAbsentReason", codeable_concept_registry),
    PropertyDef::complex("interpretation", codeable_concept_registry).many(),
    PropertyDef::complex("referenceRange", reference_range_registry).many(),
];

pub static OBSERVATION_COMPONENT: PropertyRegistry = PropertyRegistry::new(
    "ObservationComponent",
    EntityKind::Backbone,
    COMPONENT_PROPERTIES,
);

const OBSERVATION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("identifier", identifier_registry).many(),
    PropertyDef::complex("basedOn", reference_registry).many(),
    PropertyDef::complex("partOf", reference_registry).many(),
    PropertyDef::primitive("status").required(),
    PropertyDef::complex("category", codeable_concept_registry).many(),
    PropertyDef::complex("code", codeable_concept_registry).required(),
    PropertyDef::complex("subject", reference_registry),
    PropertyDef::complex("focus", reference_registry).many(),
    PropertyDef::complex("encounter", reference_registry),
    PropertyDef::primitive("effectiveDateTime").choice_of("effective"),
    PropertyDef::complex("effectivePeriod", period_registry).choice_of("effective"),
    PropertyDef::opaque("effectiveTiming").choice_of("effective"),
    PropertyDef::primitive("effectiveInstant").choice_of("effective"),
    PropertyDef::primitive("issued"),
    PropertyDef::complex("performer", reference_registry).many(),
    PropertyDef::complex("valueQuantity", quantity_registry).choice_of("value"),
    PropertyDef::complex("valueCodeableConcept", codeable_concept_registry).choice_of("value"),
    PropertyDef::primitive("valueString").choice_of("value"),
    PropertyDef::primitive("valueBoolean").choice_of("value"),
    PropertyDef::primitive("valueInteger").choice_of("value"),
    PropertyDef::complex("valueRange", range_registry).choice_of("value"),
    PropertyDef::opaque("valueRatio").choice_of("value"),
    PropertyDef::opaque("valueSampledData").choice_of("value"),
    PropertyDef::primitive("valueTime").choice_of("value"),
    PropertyDef::primitive("valueDateTime").choice_of("value"),
    PropertyDef::complex("valuePeriod", period_registry).choice_of("value"),
    PropertyDef::complex("dataAbsentReason", codeable_concept_registry),
    PropertyDef::complex("interpretation", codeable_concept_registry).many(),
    PropertyDef::complex("note", annotation_registry).many(),
    PropertyDef::complex("bodySite", codeable_concept_registry),
    PropertyDef::complex("method", codeable_concept_registry),
    PropertyDef::complex("specimen", reference_registry),
    PropertyDef::complex("device", reference_registry),
    PropertyDef::complex("referenceRange", reference_range_registry).many(),
    PropertyDef::complex("hasMember", reference_registry).many(),
    PropertyDef::complex("derivedFrom", reference_registry).many(),
    PropertyDef::complex("component", component_registry).many(),
];

pub static OBSERVATION: PropertyRegistry = PropertyRegistry::new(
    "Observation",
    EntityKind::DomainResource,
    OBSERVATION_PROPERTIES,
);

fn reference_range_registry() -> &'static PropertyRegistry {
    &OBSERVATION_REFERENCE_RANGE
}

fn component_registry() -> &'static PropertyRegistry {
    &OBSERVATION_COMPONENT
}

fhir_entity! {
    /// Measurements and simple assertions made about a subject
    pub struct Observation => OBSERVATION;
    pub builder ObservationBuilder;
}

fhir_entity! {
    pub struct ObservationReferenceRange => OBSERVATION_REFERENCE_RANGE;
    pub builder ObservationReferenceRangeBuilder;
}

fhir_entity! {
    /// Component result, sharing the value shapes of the parent observation
    pub struct ObservationComponent => OBSERVATION_COMPONENT;
    pub builder ObservationComponentBuilder;
}

/// `Observation.value[x]` (and `Observation.component.value[x]`)
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    Quantity(Quantity),
    CodeableConcept(CodeableConcept),
    String(String),
    Boolean(bool),
    Integer(i64),
    Range(Range),
    Ratio(Value),
    SampledData(Value),
    Time(String),
    DateTime(String),
    Period(Period),
}

impl ObservationValue {
    /// Concrete property name this value is stored under
    pub fn property_name(&self) -> &'static str {
        match self {
            Self::Quantity(_) => "valueQuantity",
            Self::CodeableConcept(_) => "valueCodeableConcept",
            Self::String(_) => "valueString",
            Self::Boolean(_) => "valueBoolean",
            Self::Integer(_) => "valueInteger",
            Self::Range(_) => "valueRange",
            Self::Ratio(_) => "valueRatio",
            Self::SampledData(_) => "valueSampledData",
            Self::Time(_) => "valueTime",
            Self::DateTime(_) => "valueDateTime",
            Self::Period(_) => "valuePeriod",
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Quantity(quantity) => quantity.into(),
            Self::CodeableConcept(concept) => concept.into(),
            Self::String(s) | Self::Time(s) | Self::DateTime(s) => Value::String(s),
            Self::Boolean(b) => Value::Bool(b),
            Self::Integer(i) => Value::from(i),
            Self::Range(range) => range.into(),
            Self::Ratio(value) | Self::SampledData(value) => value,
            Self::Period(period) => period.into(),
        }
    }

    fn from_node(node: &Node) -> Option<Self> {
        let (name, value) = node.choice("value")?;
        let text = || value.as_str().map(str::to_string);
        match name {
            "valueQuantity" => Some(Self::Quantity(Quantity::from_json(value.clone()))),
            "valueCodeableConcept" => Some(Self::CodeableConcept(CodeableConcept::from_json(
                value.clone(),
            ))),
            "valueString" => text().map(Self::String),
            "valueBoolean" => value.as_bool().map(Self::Boolean),
            "valueInteger" => value.as_i64().map(Self::Integer),
            "valueRange" => Some(Self::Range(Range::from_json(value.clone()))),
            "valueRatio" => Some(Self::Ratio(value.clone())),
            "valueSampledData" => Some(Self::SampledData(value.clone())),
            "valueTime" => text().map(Self::Time),
            "valueDateTime" => text().map(Self::DateTime),
            "valuePeriod" => Some(Self::Period(Period::from_json(value.clone()))),
            _ => None,
        }
    }
}

/// `Observation.effective[x]`
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationEffective {
    DateTime(String),
    Period(Period),
    Timing(Value),
    Instant(String),
}

impl ObservationEffective {
    fn into_member(self) -> (&'static str, Value) {
        match self {
            Self::DateTime(when) => ("effectiveDateTime", Value::String(when)),
            Self::Period(period) => ("effectivePeriod", period.into()),
            Self::Timing(timing) => ("effectiveTiming", timing),
            Self::Instant(instant) => ("effectiveInstant", Value::String(instant)),
        }
    }
}

impl Observation {
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.node().get_all("identifier")
    }

    pub fn status(&self) -> Option<&str> {
        self.node().get_str("status")
    }

    pub fn categories(&self) -> Vec<CodeableConcept> {
        self.node().get_all("category")
    }

    pub fn code(&self) -> Option<CodeableConcept> {
        self.node().get_as("code")
    }

    pub fn subject(&self) -> Option<Reference> {
        self.node().get_as("subject")
    }

    pub fn encounter(&self) -> Option<Reference> {
        self.node().get_as("encounter")
    }

    pub fn effective(&self) -> Option<ObservationEffective> {
        let (name, value) = self.node().choice("effective")?;
        match name {
            "effectiveDateTime" => value
                .as_str()
                .map(|s| ObservationEffective::DateTime(s.to_string())),
            "effectivePeriod" => Some(ObservationEffective::Period(Period::from_json(
                value.clone(),
            ))),
            "effectiveTiming" => Some(ObservationEffective::Timing(value.clone())),
            "effectiveInstant" => value
                .as_str()
                .map(|s| ObservationEffective::Instant(s.to_string())),
            _ => None,
        }
    }

    pub fn issued(&self) -> Option<&str> {
        self.node().get_str("issued")
    }

    pub fn performers(&self) -> Vec<Reference> {
        self.node().get_all("performer")
    }

    pub fn value(&self) -> Option<ObservationValue> {
        ObservationValue::from_node(self.node())
    }

    pub fn data_absent_reason(&self) -> Option<CodeableConcept> {
        self.node().get_as("dataAbsentReason")
    }

    pub fn interpretations(&self) -> Vec<CodeableConcept> {
        self.node().get_all("interpretation")
    }

    pub fn notes(&self) -> Vec<Annotation> {
        self.node().get_all("note")
    }

    pub fn reference_ranges(&self) -> Vec<ObservationReferenceRange> {
        self.node().get_all("referenceRange")
    }

    pub fn has_members(&self) -> Vec<Reference> {
        self.node().get_all("hasMember")
    }

    pub fn components(&self) -> Vec<ObservationComponent> {
        self.node().get_all("component")
    }

    /// Component whose code carries `system|code`
    pub fn component(&self, system: &str, code: &str) -> Option<ObservationComponent> {
        self.components().into_iter().find(|component| {
            component
                .code()
                .is_some_and(|concept| concept.has_code(system, code))
        })
    }
}

impl ObservationBuilder {
    pub fn identifier(self, identifier: Identifier) -> Self {
        self.add("identifier", identifier)
    }

    pub fn based_on(self, reference: Reference) -> Self {
        self.add("basedOn", reference)
    }

    pub fn status(self, status: impl Into<String>) -> Self {
        self.set("status", status.into())
    }

    pub fn category(self, category: CodeableConcept) -> Self {
        self.add("category", category)
    }

    pub fn code(self, code: CodeableConcept) -> Self {
        self.set("code", code)
    }

    pub fn subject(self, subject: Reference) -> Self {
        self.set("subject", subject)
    }

    pub fn encounter(self, encounter: Reference) -> Self {
        self.set("encounter", encounter)
    }

    pub fn effective(self, effective: ObservationEffective) -> Self {
        let (name, value) = effective.into_member();
        self.set_choice(name, value)
    }

    pub fn issued(self, issued: impl Into<String>) -> Self {
        self.set("issued", issued.into())
    }

    pub fn performer(self, performer: Reference) -> Self {
        self.add("performer", performer)
    }

    pub fn value(self, value: ObservationValue) -> Self {
        let name = value.property_name();
        self.set_choice(name, value.into_value())
    }

    pub fn data_absent_reason(self, reason: CodeableConcept) -> Self {
        self.set("dataAbsentReason", reason)
    }

    pub fn interpretation(self, interpretation: CodeableConcept) -> Self {
        self.add("interpretation", interpretation)
    }

    pub fn note(self, note: Annotation) -> Self {
        self.add("note", note)
    }

    pub fn reference_range(self, range: ObservationReferenceRange) -> Self {
        self.add("referenceRange", range)
    }

    pub fn has_member(self, member: Reference) -> Self {
        self.add("hasMember", member)
    }

    pub fn component(self, component: ObservationComponent) -> Self {
        self.add("component", component)
    }
}

impl ObservationReferenceRange {
    pub fn low(&self) -> Option<Quantity> {
        self.node().get_as("low")
    }

    pub fn high(&self) -> Option<Quantity> {
        self.node().get_as("high")
    }

    pub fn text(&self) -> Option<&str> {
        self.node().get_str("text")
    }

    /// Whether `value` falls inside the bounds that are present
    pub fn contains(&self, value: f64) -> bool {
        let above_low = self
            .low()
            .and_then(|low| low.value())
            .map_or(true, |low| value >= low);
        let below_high = self
            .high()
            .and_then(|high| high.value())
            .map_or(true, |high| value <= high);
        above_low && below_high
    }
}

impl ObservationReferenceRangeBuilder {
    pub fn low(self, low: Quantity) -> Self {
        self.set("low", low)
    }

    pub fn high(self, high: Quantity) -> Self {
        self.set("high", high)
    }

    pub fn type_(self, type_: CodeableConcept) -> Self {
        self.set("type", type_)
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.set("text", text.into())
    }
}

impl ObservationComponent {
    pub fn code(&self) -> Option<CodeableConcept> {
        self.node().get_as("code")
    }

    pub fn value(&self) -> Option<ObservationValue> {
        ObservationValue::from_node(self.node())
    }

    pub fn interpretations(&self) -> Vec<CodeableConcept> {
        self.node().get_all("interpretation")
    }
}

impl ObservationComponentBuilder {
    pub fn code(self, code: CodeableConcept) -> Self {
        self.set("code", code)
    }

    pub fn value(self, value: ObservationValue) -> Self {
        let name = value.property_name();
        self.set_choice(name, value.into_value())
    }

    pub fn data_absent_reason(self, reason: CodeableConcept) -> Self {
        self.set("dataAbsentReason", reason)
    }

    pub fn interpretation(self, interpretation: CodeableConcept) -> Self {
        self.add("interpretation", interpretation)
    }

    pub fn reference_range(self, range: ObservationReferenceRange) -> Self {
        self.add("referenceRange", range)
    }
}
