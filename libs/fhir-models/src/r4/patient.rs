//! R4 Patient

use ferrum_binding::{fhir_entity, Entity, EntityKind, PropertyDef, PropertyRegistry, Value};

use super::datatypes::{
    address_registry, codeable_concept_registry, contact_point_registry, human_name_registry,
    identifier_registry, period_registry, reference_registry, Address, CodeableConcept,
    ContactPoint, HumanName, Identifier, Reference,
};

const PATIENT_CONTACT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("relationship", codeable_concept_registry).many(),
    PropertyDef::complex("name", human_name_registry),
    PropertyDef::complex("telecom", contact_point_registry).many(),
    PropertyDef::complex("address", address_registry),
    PropertyDef::primitive("gender"),
    PropertyDef::complex("organization", reference_registry),
    PropertyDef::complex("period", period_registry),
];

pub static PATIENT_CONTACT: PropertyRegistry = PropertyRegistry::new(
    "PatientContact",
    EntityKind::Backbone,
    PATIENT_CONTACT_PROPERTIES,
);

const PATIENT_COMMUNICATION_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("language", codeable_concept_registry).required(),
    PropertyDef::primitive("preferred"),
];

pub static PATIENT_COMMUNICATION: PropertyRegistry = PropertyRegistry::new(
    "PatientCommunication",
    EntityKind::Backbone,
    PATIENT_COMMUNICATION_PROPERTIES,
);

const PATIENT_LINK_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("other", reference_registry).required(),
    PropertyDef::primitive("type").required(),
];

pub static PATIENT_LINK: PropertyRegistry =
    PropertyRegistry::new("PatientLink", EntityKind::Backbone, PATIENT_LINK_PROPERTIES);

const PATIENT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("identifier", identifier_registry).many(),
    PropertyDef::primitive("active"),
    PropertyDef::complex("name", human_name_registry).many(),
    PropertyDef::complex("telecom", contact_point_registry).many(),
    PropertyDef::primitive("gender"),
    PropertyDef::primitive("birthDate"),
    PropertyDef::primitive("deceasedBoolean").choice_of("deceased"),
    PropertyDef::primitive("deceasedDateTime").choice_of("deceased"),
    PropertyDef::complex("address", address_registry).many(),
    PropertyDef::complex("maritalStatus", codeable_concept_registry),
    PropertyDef::primitive("multipleBirthBoolean").choice_of("multipleBirth"),
    PropertyDef::primitive("multipleBirthInteger").choice_of("multipleBirth"),
    PropertyDef::opaque("photo").many(),
    PropertyDef::complex("contact", contact_registry).many(),
    PropertyDef::complex("communication", communication_registry).many(),
    PropertyDef::complex("generalPractitioner", reference_registry).many(),
    PropertyDef::complex("managingOrganization", reference_registry),
    PropertyDef::complex("link", link_registry).many(),
];

pub static PATIENT: PropertyRegistry =
    PropertyRegistry::new("Patient", EntityKind::DomainResource, PATIENT_PROPERTIES);

fn contact_registry() -> &'static PropertyRegistry {
    &PATIENT_CONTACT
}

fn communication_registry() -> &'static PropertyRegistry {
    &PATIENT_COMMUNICATION
}

fn link_registry() -> &'static PropertyRegistry {
    &PATIENT_LINK
}

fhir_entity! {
    /// Demographics and administrative information about a person receiving care
    pub struct Patient => PATIENT;
    pub builder PatientBuilder;
}

fhir_entity! {
    /// A contact party (guardian, partner, friend) for the patient
    pub struct PatientContact => PATIENT_CONTACT;
    pub builder PatientContactBuilder;
}

fhir_entity! {
    pub struct PatientCommunication => PATIENT_COMMUNICATION;
    pub builder PatientCommunicationBuilder;
}

fhir_entity! {
    /// Link to another patient resource that concerns the same actual person
    pub struct PatientLink => PATIENT_LINK;
    pub builder PatientLinkBuilder;
}

/// `Patient.deceased[x]`
#[derive(Debug, Clone, PartialEq)]
pub enum Deceased {
    Boolean(bool),
    DateTime(String),
}

impl Deceased {
    fn into_member(self) -> (&'static str, Value) {
        match self {
            Self::Boolean(flag) => ("deceasedBoolean", Value::Bool(flag)),
            Self::DateTime(when) => ("deceasedDateTime", Value::String(when)),
        }
    }
}

/// `Patient.multipleBirth[x]`
#[derive(Debug, Clone, PartialEq)]
pub enum MultipleBirth {
    Boolean(bool),
    Integer(i64),
}

impl MultipleBirth {
    fn into_member(self) -> (&'static str, Value) {
        match self {
            Self::Boolean(flag) => ("multipleBirthBoolean", Value::Bool(flag)),
            Self::Integer(order) => ("multipleBirthInteger", Value::from(order)),
        }
    }
}

impl Patient {
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.node().get_all("identifier")
    }

    pub fn active(&self) -> Option<bool> {
        self.node().get_bool("active")
    }

    pub fn names(&self) -> Vec<HumanName> {
        self.node().get_all("name")
    }

    pub fn telecom(&self) -> Vec<ContactPoint> {
        self.node().get_all("telecom")
    }

    pub fn gender(&self) -> Option<&str> {
        self.node().get_str("gender")
    }

    pub fn birth_date(&self) -> Option<&str> {
        self.node().get_str("birthDate")
    }

    pub fn deceased(&self) -> Option<Deceased> {
        match self.node().choice("deceased")? {
            ("deceasedBoolean", value) => value.as_bool().map(Deceased::Boolean),
            ("deceasedDateTime", value) => value.as_str().map(|s| Deceased::DateTime(s.to_string())),
            _ => None,
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.node().get_all("address")
    }

    pub fn marital_status(&self) -> Option<CodeableConcept> {
        self.node().get_as("maritalStatus")
    }

    pub fn multiple_birth(&self) -> Option<MultipleBirth> {
        match self.node().choice("multipleBirth")? {
            ("multipleBirthBoolean", value) => value.as_bool().map(MultipleBirth::Boolean),
            ("multipleBirthInteger", value) => value.as_i64().map(MultipleBirth::Integer),
            _ => None,
        }
    }

    pub fn contacts(&self) -> Vec<PatientContact> {
        self.node().get_all("contact")
    }

    pub fn communications(&self) -> Vec<PatientCommunication> {
        self.node().get_all("communication")
    }

    pub fn general_practitioners(&self) -> Vec<Reference> {
        self.node().get_all("generalPractitioner")
    }

    pub fn managing_organization(&self) -> Option<Reference> {
        self.node().get_as("managingOrganization")
    }

    pub fn links(&self) -> Vec<PatientLink> {
        self.node().get_all("link")
    }

    /// Value of the first identifier issued by `system`
    pub fn identifier_value(&self, system: &str) -> Option<String> {
        self.identifiers()
            .into_iter()
            .find(|identifier| identifier.system() == Some(system))
            .and_then(|identifier| identifier.value().map(str::to_string))
    }

    /// Display form of the first name with `use = official`, falling back to the first name
    pub fn official_name(&self) -> Option<String> {
        let names = self.names();
        names
            .iter()
            .find(|name| name.use_() == Some("official"))
            .or_else(|| names.first())
            .and_then(HumanName::display)
    }
}

impl PatientBuilder {
    pub fn identifier(self, identifier: Identifier) -> Self {
        self.add("identifier", identifier)
    }

    pub fn active(self, active: bool) -> Self {
        self.set("active", active)
    }

    pub fn name(self, name: HumanName) -> Self {
        self.add("name", name)
    }

    pub fn telecom(self, telecom: ContactPoint) -> Self {
        self.add("telecom", telecom)
    }

    pub fn gender(self, gender: impl Into<String>) -> Self {
        self.set("gender", gender.into())
    }

    pub fn birth_date(self, birth_date: impl Into<String>) -> Self {
        self.set("birthDate", birth_date.into())
    }

    pub fn deceased(self, deceased: Deceased) -> Self {
        let (name, value) = deceased.into_member();
        self.set_choice(name, value)
    }

    pub fn address(self, address: Address) -> Self {
        self.add("address", address)
    }

    pub fn marital_status(self, status: CodeableConcept) -> Self {
        self.set("maritalStatus", status)
    }

    pub fn multiple_birth(self, multiple_birth: MultipleBirth) -> Self {
        let (name, value) = multiple_birth.into_member();
        self.set_choice(name, value)
    }

    pub fn contact(self, contact: PatientContact) -> Self {
        self.add("contact", contact)
    }

    pub fn communication(self, communication: PatientCommunication) -> Self {
        self.add("communication", communication)
    }

    pub fn general_practitioner(self, practitioner: Reference) -> Self {
        self.add("generalPractitioner", practitioner)
    }

    pub fn managing_organization(self, organization: Reference) -> Self {
        self.set("managingOrganization", organization)
    }

    pub fn link(self, link: PatientLink) -> Self {
        self.add("link", link)
    }
}

impl PatientContact {
    pub fn relationships(&self) -> Vec<CodeableConcept> {
        self.node().get_all("relationship")
    }

    pub fn name(&self) -> Option<HumanName> {
        self.node().get_as("name")
    }

    pub fn telecom(&self) -> Vec<ContactPoint> {
        self.node().get_all("telecom")
    }

    pub fn gender(&self) -> Option<&str> {
        self.node().get_str("gender")
    }

    pub fn organization(&self) -> Option<Reference> {
        self.node().get_as("organization")
    }
}

impl PatientContactBuilder {
    pub fn relationship(self, relationship: CodeableConcept) -> Self {
        self.add("relationship", relationship)
    }

    pub fn name(self, name: HumanName) -> Self {
        self.set("name", name)
    }

    pub fn telecom(self, telecom: ContactPoint) -> Self {
        self.add("telecom", telecom)
    }

    pub fn address(self, address: Address) -> Self {
        self.set("address", address)
    }

    pub fn gender(self, gender: impl Into<String>) -> Self {
        self.set("gender", gender.into())
    }

    pub fn organization(self, organization: Reference) -> Self {
        self.set("organization", organization)
    }
}

impl PatientCommunication {
    pub fn new(language: CodeableConcept, preferred: bool) -> Self {
        Self::builder()
            .set("language", language)
            .set("preferred", preferred)
            .build()
    }

    pub fn language(&self) -> Option<CodeableConcept> {
        self.node().get_as("language")
    }

    pub fn preferred(&self) -> bool {
        self.node().get_bool("preferred").unwrap_or(false)
    }
}

impl PatientLink {
    /// `link_type` is one of `replaced-by | replaces | refer | seealso`
    pub fn new(other: Reference, link_type: impl Into<String>) -> Self {
        Self::builder()
            .set("other", other)
            .set("type", link_type.into())
            .build()
    }

    pub fn other(&self) -> Option<Reference> {
        self.node().get_as("other")
    }

    pub fn link_type(&self) -> Option<&str> {
        self.node().get_str("type")
    }
}
