//! General-purpose R4 data types

use ferrum_binding::{fhir_entity, Entity, EntityKind, PropertyDef, PropertyRegistry, Value};

const CODING_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("system"),
    PropertyDef::primitive("version"),
    PropertyDef::primitive("code"),
    PropertyDef::primitive("display"),
    PropertyDef::primitive("userSelected"),
];

pub static CODING: PropertyRegistry =
    PropertyRegistry::new("Coding", EntityKind::DataType, CODING_PROPERTIES);

const CODEABLE_CONCEPT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("coding", coding_registry).many(),
    PropertyDef::primitive("text"),
];

pub static CODEABLE_CONCEPT: PropertyRegistry = PropertyRegistry::new(
    "CodeableConcept",
    EntityKind::DataType,
    CODEABLE_CONCEPT_PROPERTIES,
);

const QUANTITY_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("value"),
    PropertyDef::primitive("comparator"),
    PropertyDef::primitive("unit"),
    PropertyDef::primitive("system"),
    PropertyDef::primitive("code"),
];

pub static QUANTITY: PropertyRegistry =
    PropertyRegistry::new("Quantity", EntityKind::DataType, QUANTITY_PROPERTIES);

const PERIOD_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("start"),
    PropertyDef::primitive("end"),
];

pub static PERIOD: PropertyRegistry =
    PropertyRegistry::new("Period", EntityKind::DataType, PERIOD_PROPERTIES);

const RANGE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("low", quantity_registry),
    PropertyDef::complex("high", quantity_registry),
];

pub static RANGE: PropertyRegistry =
    PropertyRegistry::new("Range", EntityKind::DataType, RANGE_PROPERTIES);

const IDENTIFIER_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("use"),
    PropertyDef::complex("type", codeable_concept_registry),
    PropertyDef::primitive("system"),
    PropertyDef::primitive("value"),
    PropertyDef::complex("period", period_registry),
    PropertyDef::complex("assigner", reference_registry),
];

pub static IDENTIFIER: PropertyRegistry =
    PropertyRegistry::new("Identifier", EntityKind::DataType, IDENTIFIER_PROPERTIES);

const HUMAN_NAME_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("use"),
    PropertyDef::primitive("text"),
    PropertyDef::primitive("family"),
    PropertyDef::primitive("given").many(),
    PropertyDef::primitive("prefix").many(),
    PropertyDef::primitive("suffix").many(),
    PropertyDef::complex("period", period_registry),
];

pub static HUMAN_NAME: PropertyRegistry =
    PropertyRegistry::new("HumanName", EntityKind::DataType, HUMAN_NAME_PROPERTIES);

const CONTACT_POINT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("system"),
    PropertyDef::primitive("value"),
    PropertyDef::primitive("use"),
    PropertyDef::primitive("rank"),
    PropertyDef::complex("period", period_registry),
];

pub static CONTACT_POINT: PropertyRegistry =
    PropertyRegistry::new("ContactPoint", EntityKind::DataType, CONTACT_POINT_PROPERTIES);

const ADDRESS_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("use"),
    PropertyDef::primitive("type"),
    PropertyDef::primitive("text"),
    PropertyDef::primitive("line").many(),
    PropertyDef::primitive("city"),
    PropertyDef::primitive("district"),
    PropertyDef::primitive("state"),
    PropertyDef::primitive("postalCode"),
    PropertyDef::primitive("country"),
    PropertyDef::complex("period", period_registry),
];

pub static ADDRESS: PropertyRegistry =
    PropertyRegistry::new("Address", EntityKind::DataType, ADDRESS_PROPERTIES);

const REFERENCE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("reference"),
    PropertyDef::primitive("type"),
    PropertyDef::complex("identifier", identifier_registry),
    PropertyDef::primitive("display"),
];

pub static REFERENCE: PropertyRegistry =
    PropertyRegistry::new("Reference", EntityKind::DataType, REFERENCE_PROPERTIES);

const ANNOTATION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("authorReference", reference_registry).choice_of("author"),
    PropertyDef::primitive("authorString").choice_of("author"),
    PropertyDef::primitive("time"),
    PropertyDef::primitive("text").required(),
];

pub static ANNOTATION: PropertyRegistry =
    PropertyRegistry::new("Annotation", EntityKind::DataType, ANNOTATION_PROPERTIES);

pub fn coding_registry() -> &'static PropertyRegistry {
    &CODING
}

pub fn codeable_concept_registry() -> &'static PropertyRegistry {
    &CODEABLE_CONCEPT
}

pub fn quantity_registry() -> &'static PropertyRegistry {
    &QUANTITY
}

pub fn period_registry() -> &'static PropertyRegistry {
    &PERIOD
}

pub fn range_registry() -> &'static PropertyRegistry {
    &RANGE
}

pub fn identifier_registry() -> &'static PropertyRegistry {
    &IDENTIFIER
}

pub fn human_name_registry() -> &'static PropertyRegistry {
    &HUMAN_NAME
}

pub fn contact_point_registry() -> &'static PropertyRegistry {
    &CONTACT_POINT
}

pub fn address_registry() -> &'static PropertyRegistry {
    &ADDRESS
}

pub fn reference_registry() -> &'static PropertyRegistry {
    &REFERENCE
}

pub fn annotation_registry() -> &'static PropertyRegistry {
    &ANNOTATION
}

fhir_entity! {
    /// A reference to a code defined by a terminology system
    pub struct Coding => CODING;
    pub builder CodingBuilder;
}

fhir_entity! {
    /// Concept given by one or more codings and/or text
    pub struct CodeableConcept => CODEABLE_CONCEPT;
    pub builder CodeableConceptBuilder;
}

fhir_entity! {
    /// A measured amount
    pub struct Quantity => QUANTITY;
    pub builder QuantityBuilder;
}

fhir_entity! {
    pub struct Period => PERIOD;
    pub builder PeriodBuilder;
}

fhir_entity! {
    pub struct Range => RANGE;
    pub builder RangeBuilder;
}

fhir_entity! {
    /// A business identifier
    pub struct Identifier => IDENTIFIER;
    pub builder IdentifierBuilder;
}

fhir_entity! {
    pub struct HumanName => HUMAN_NAME;
    pub builder HumanNameBuilder;
}

fhir_entity! {
    /// Phone, email, url and similar contact details
    pub struct ContactPoint => CONTACT_POINT;
    pub builder ContactPointBuilder;
}

fhir_entity! {
    pub struct Address => ADDRESS;
    pub builder AddressBuilder;
}

fhir_entity! {
    /// A reference from one resource to another
    pub struct Reference => REFERENCE;
    pub builder ReferenceBuilder;
}

fhir_entity! {
    /// Text note with author attribution
    pub struct Annotation => ANNOTATION;
    pub builder AnnotationBuilder;
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self::builder().system(system).code(code).build()
    }

    pub fn system(&self) -> Option<&str> {
        self.node().get_str("system")
    }

    pub fn version(&self) -> Option<&str> {
        self.node().get_str("version")
    }

    pub fn code(&self) -> Option<&str> {
        self.node().get_str("code")
    }

    pub fn display(&self) -> Option<&str> {
        self.node().get_str("display")
    }

    pub fn user_selected(&self) -> Option<bool> {
        self.node().get_bool("userSelected")
    }

    /// Same system and code
    pub fn matches(&self, system: &str, code: &str) -> bool {
        self.system() == Some(system) && self.code() == Some(code)
    }
}

impl CodingBuilder {
    pub fn system(self, system: impl Into<String>) -> Self {
        self.set("system", system.into())
    }

    pub fn version(self, version: impl Into<String>) -> Self {
        self.set("version", version.into())
    }

    pub fn code(self, code: impl Into<String>) -> Self {
        self.set("code", code.into())
    }

    pub fn display(self, display: impl Into<String>) -> Self {
        self.set("display", display.into())
    }

    pub fn user_selected(self, user_selected: bool) -> Self {
        self.set("userSelected", user_selected)
    }
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self::builder().coding(coding).build()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::builder().text(text).build()
    }

    pub fn codings(&self) -> Vec<Coding> {
        self.node().get_all("coding")
    }

    pub fn text(&self) -> Option<&str> {
        self.node().get_str("text")
    }

    pub fn has_code(&self, system: &str, code: &str) -> bool {
        self.codings()
            .iter()
            .any(|coding| coding.matches(system, code))
    }
}

impl CodeableConceptBuilder {
    pub fn coding(self, coding: Coding) -> Self {
        self.add("coding", coding)
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.set("text", text.into())
    }
}

/// System URI for UCUM units
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self::builder().value(value).unit(unit).build()
    }

    /// Quantity with a UCUM code used as both `code` and `unit`
    pub fn ucum(value: f64, code: impl Into<String>) -> Self {
        let code = code.into();
        Self::builder()
            .value(value)
            .unit(code.clone())
            .system(UCUM_SYSTEM)
            .code(code)
            .build()
    }

    pub fn value(&self) -> Option<f64> {
        self.node().get_f64("value")
    }

    pub fn comparator(&self) -> Option<&str> {
        self.node().get_str("comparator")
    }

    pub fn unit(&self) -> Option<&str> {
        self.node().get_str("unit")
    }

    pub fn system(&self) -> Option<&str> {
        self.node().get_str("system")
    }

    pub fn code(&self) -> Option<&str> {
        self.node().get_str("code")
    }
}

impl QuantityBuilder {
    pub fn value(self, value: f64) -> Self {
        self.set("value", value)
    }

    pub fn comparator(self, comparator: impl Into<String>) -> Self {
        self.set("comparator", comparator.into())
    }

    pub fn unit(self, unit: impl Into<String>) -> Self {
        self.set("unit", unit.into())
    }

    pub fn system(self, system: impl Into<String>) -> Self {
        self.set("system", system.into())
    }

    pub fn code(self, code: impl Into<String>) -> Self {
        self.set("code", code.into())
    }
}

impl Period {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::builder().start(start).end(end).build()
    }

    pub fn start(&self) -> Option<&str> {
        self.node().get_str("start")
    }

    pub fn end(&self) -> Option<&str> {
        self.node().get_str("end")
    }

    /// No end given
    pub fn is_open(&self) -> bool {
        self.end().is_none()
    }
}

impl PeriodBuilder {
    pub fn start(self, start: impl Into<String>) -> Self {
        self.set("start", start.into())
    }

    pub fn end(self, end: impl Into<String>) -> Self {
        self.set("end", end.into())
    }
}

impl Range {
    pub fn new(low: Quantity, high: Quantity) -> Self {
        Self::builder().low(low).high(high).build()
    }

    pub fn low(&self) -> Option<Quantity> {
        self.node().get_as("low")
    }

    pub fn high(&self) -> Option<Quantity> {
        self.node().get_as("high")
    }
}

impl RangeBuilder {
    pub fn low(self, low: Quantity) -> Self {
        self.set("low", low)
    }

    pub fn high(self, high: Quantity) -> Self {
        self.set("high", high)
    }
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self::builder().system(system).value(value).build()
    }

    pub fn use_(&self) -> Option<&str> {
        self.node().get_str("use")
    }

    pub fn type_(&self) -> Option<CodeableConcept> {
        self.node().get_as("type")
    }

    pub fn system(&self) -> Option<&str> {
        self.node().get_str("system")
    }

    pub fn value(&self) -> Option<&str> {
        self.node().get_str("value")
    }

    pub fn period(&self) -> Option<Period> {
        self.node().get_as("period")
    }

    pub fn assigner(&self) -> Option<Reference> {
        self.node().get_as("assigner")
    }
}

impl IdentifierBuilder {
    pub fn use_(self, use_: impl Into<String>) -> Self {
        self.set("use", use_.into())
    }

    pub fn type_(self, type_: CodeableConcept) -> Self {
        self.set("type", type_)
    }

    pub fn system(self, system: impl Into<String>) -> Self {
        self.set("system", system.into())
    }

    pub fn value(self, value: impl Into<String>) -> Self {
        self.set("value", value.into())
    }

    pub fn period(self, period: Period) -> Self {
        self.set("period", period)
    }

    pub fn assigner(self, assigner: Reference) -> Self {
        self.set("assigner", assigner)
    }
}

impl HumanName {
    pub fn use_(&self) -> Option<&str> {
        self.node().get_str("use")
    }

    pub fn text(&self) -> Option<&str> {
        self.node().get_str("text")
    }

    pub fn family(&self) -> Option<&str> {
        self.node().get_str("family")
    }

    pub fn given(&self) -> Vec<&str> {
        self.node().get_strings("given")
    }

    pub fn prefix(&self) -> Vec<&str> {
        self.node().get_strings("prefix")
    }

    pub fn suffix(&self) -> Vec<&str> {
        self.node().get_strings("suffix")
    }

    pub fn period(&self) -> Option<Period> {
        self.node().get_as("period")
    }

    /// `text` if present, otherwise given names followed by the family name
    pub fn display(&self) -> Option<String> {
        if let Some(text) = self.text() {
            return Some(text.to_string());
        }
        let parts: Vec<&str> = self.given().into_iter().chain(self.family()).collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

impl HumanNameBuilder {
    pub fn use_(self, use_: impl Into<String>) -> Self {
        self.set("use", use_.into())
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.set("text", text.into())
    }

    pub fn family(self, family: impl Into<String>) -> Self {
        self.set("family", family.into())
    }

    pub fn given(self, given: impl Into<String>) -> Self {
        self.add("given", given.into())
    }

    pub fn prefix(self, prefix: impl Into<String>) -> Self {
        self.add("prefix", prefix.into())
    }

    pub fn suffix(self, suffix: impl Into<String>) -> Self {
        self.add("suffix", suffix.into())
    }

    pub fn period(self, period: Period) -> Self {
        self.set("period", period)
    }
}

impl ContactPoint {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self::builder().system(system).value(value).build()
    }

    pub fn system(&self) -> Option<&str> {
        self.node().get_str("system")
    }

    pub fn value(&self) -> Option<&str> {
        self.node().get_str("value")
    }

    pub fn use_(&self) -> Option<&str> {
        self.node().get_str("use")
    }

    pub fn rank(&self) -> Option<i64> {
        self.node().get_i64("rank")
    }
}

impl ContactPointBuilder {
    pub fn system(self, system: impl Into<String>) -> Self {
        self.set("system", system.into())
    }

    pub fn value(self, value: impl Into<String>) -> Self {
        self.set("value", value.into())
    }

    pub fn use_(self, use_: impl Into<String>) -> Self {
        self.set("use", use_.into())
    }

    pub fn rank(self, rank: u32) -> Self {
        self.set("rank", rank)
    }

    pub fn period(self, period: Period) -> Self {
        self.set("period", period)
    }
}

impl Address {
    pub fn lines(&self) -> Vec<&str> {
        self.node().get_strings("line")
    }

    pub fn city(&self) -> Option<&str> {
        self.node().get_str("city")
    }

    pub fn postal_code(&self) -> Option<&str> {
        self.node().get_str("postalCode")
    }

    pub fn country(&self) -> Option<&str> {
        self.node().get_str("country")
    }
}

impl AddressBuilder {
    pub fn use_(self, use_: impl Into<String>) -> Self {
        self.set("use", use_.into())
    }

    pub fn line(self, line: impl Into<String>) -> Self {
        self.add("line", line.into())
    }

    pub fn city(self, city: impl Into<String>) -> Self {
        self.set("city", city.into())
    }

    pub fn postal_code(self, postal_code: impl Into<String>) -> Self {
        self.set("postalCode", postal_code.into())
    }

    pub fn country(self, country: impl Into<String>) -> Self {
        self.set("country", country.into())
    }
}

impl Reference {
    /// Literal reference such as `Patient/123`
    pub fn to(reference: impl Into<String>) -> Self {
        Self::builder().reference(reference).build()
    }

    pub fn reference(&self) -> Option<&str> {
        self.node().get_str("reference")
    }

    pub fn type_(&self) -> Option<&str> {
        self.node().get_str("type")
    }

    pub fn identifier(&self) -> Option<Identifier> {
        self.node().get_as("identifier")
    }

    pub fn display(&self) -> Option<&str> {
        self.node().get_str("display")
    }

    /// Explicit `type`, or the type segment of a relative literal reference
    pub fn target_type(&self) -> Option<&str> {
        if let Some(type_) = self.type_() {
            return Some(type_);
        }
        let reference = self.reference()?;
        if reference.starts_with('#') || reference.contains("://") {
            return None;
        }
        reference
            .split('/')
            .next()
            .filter(|segment| segment.starts_with(|c: char| c.is_ascii_uppercase()))
    }
}

impl ReferenceBuilder {
    pub fn reference(self, reference: impl Into<String>) -> Self {
        self.set("reference", reference.into())
    }

    pub fn type_(self, type_: impl Into<String>) -> Self {
        self.set("type", type_.into())
    }

    pub fn identifier(self, identifier: Identifier) -> Self {
        self.set("identifier", identifier)
    }

    pub fn display(self, display: impl Into<String>) -> Self {
        self.set("display", display.into())
    }
}

/// `Annotation.author[x]`
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationAuthor {
    Reference(Reference),
    String(String),
}

impl AnnotationAuthor {
    fn property_name(&self) -> &'static str {
        match self {
            Self::Reference(_) => "authorReference",
            Self::String(_) => "authorString",
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Reference(reference) => reference.into(),
            Self::String(name) => Value::String(name),
        }
    }
}

impl Annotation {
    pub fn new(text: impl Into<String>) -> Self {
        Self::builder().text(text).build()
    }

    pub fn author(&self) -> Option<AnnotationAuthor> {
        match self.node().choice("author")? {
            ("authorReference", value) => {
                Some(AnnotationAuthor::Reference(Reference::from_json(value.clone())))
            }
            ("authorString", value) => value.as_str().map(|s| AnnotationAuthor::String(s.to_string())),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<&str> {
        self.node().get_str("time")
    }

    pub fn text(&self) -> Option<&str> {
        self.node().get_str("text")
    }
}

impl AnnotationBuilder {
    pub fn author(self, author: AnnotationAuthor) -> Self {
        let name = author.property_name();
        self.set_choice(name, author.into_value())
    }

    pub fn time(self, time: impl Into<String>) -> Self {
        self.set("time", time.into())
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.set("text", text.into())
    }
}
