//! Property registries
//!
//! Every concrete FHIR type is described by one [`PropertyRegistry`]: an ordered,
//! constant table of [`PropertyDef`]s. The registry decides which snapshot keys are
//! bound on construction and the exact order in which set properties are emitted.
//!
//! A registry only lists the properties its type declares itself. The slots
//! inherited from the element hierarchy (`id`, `extension`, `meta`, `contained`, ...)
//! are contributed by the registry's [`EntityKind`] and are laid out in front of the
//! declared properties. Primitive properties get a sidecar slot (`_name`) placed
//! directly after them.

use heck::ToUpperCamelCase;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::element;

/// Position of a type in the element hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Leaf or composite data type (Coding, Quantity, Period, ...)
    DataType,
    /// Nested sub-structure owned by a resource (Patient.contact, ...)
    Backbone,
    /// Resource without narrative or contained resources (Bundle, Binary, ...)
    Resource,
    /// Resource with narrative, contained resources and extensions
    DomainResource,
}

impl EntityKind {
    /// Whether entities of this kind carry a `resourceType` discriminator
    pub fn is_resource(self) -> bool {
        matches!(self, Self::Resource | Self::DomainResource)
    }

    /// Slots this kind contributes ahead of the declared properties
    pub fn base_properties(self) -> &'static [PropertyDef] {
        match self {
            Self::DataType => element::ELEMENT_BASE,
            Self::Backbone => element::BACKBONE_BASE,
            Self::Resource => element::RESOURCE_BASE,
            Self::DomainResource => element::DOMAIN_RESOURCE_BASE,
        }
    }
}

/// Accessor for a registry, used to bind nested values lazily
pub type RegistryFn = fn() -> &'static PropertyRegistry;

/// Shape of the values a property holds
#[derive(Debug, Clone, Copy)]
pub enum PropertyShape {
    /// JSON primitive (string, number, boolean)
    Primitive,
    /// Nested element; bound through its registry when one is known
    Complex(Option<RegistryFn>),
    /// Embedded resource with its own discriminator
    Resource,
}

/// A single property declaration
#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    pub name: &'static str,
    pub shape: PropertyShape,
    /// Minimum cardinality
    pub min: u32,
    /// Maximum cardinality is `*`
    pub repeats: bool,
    /// Name of the choice group (`value` for `valueQuantity`)
    pub choice_of: Option<&'static str>,
    /// Whether the property has a `_name` sidecar slot
    pub sidecar: bool,
}

impl PropertyDef {
    pub const fn primitive(name: &'static str) -> Self {
        Self {
            name,
            shape: PropertyShape::Primitive,
            min: 0,
            repeats: false,
            choice_of: None,
            sidecar: true,
        }
    }

    pub const fn complex(name: &'static str, registry: RegistryFn) -> Self {
        Self {
            name,
            shape: PropertyShape::Complex(Some(registry)),
            min: 0,
            repeats: false,
            choice_of: None,
            sidecar: false,
        }
    }

    /// Complex property whose content is copied through unbound
    pub const fn opaque(name: &'static str) -> Self {
        Self {
            name,
            shape: PropertyShape::Complex(None),
            min: 0,
            repeats: false,
            choice_of: None,
            sidecar: false,
        }
    }

    pub const fn resource(name: &'static str) -> Self {
        Self {
            name,
            shape: PropertyShape::Resource,
            min: 0,
            repeats: false,
            choice_of: None,
            sidecar: false,
        }
    }

    pub const fn required(self) -> Self {
        Self { min: 1, ..self }
    }

    pub const fn many(self) -> Self {
        Self {
            repeats: true,
            ..self
        }
    }

    pub const fn choice_of(self, group: &'static str) -> Self {
        Self {
            choice_of: Some(group),
            ..self
        }
    }

    pub const fn without_sidecar(self) -> Self {
        Self {
            sidecar: false,
            ..self
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.shape, PropertyShape::Primitive)
    }

    /// Registry used to bind nested values of this property
    pub fn nested_registry(&self) -> Option<&'static PropertyRegistry> {
        match self.shape {
            PropertyShape::Complex(Some(registry)) => Some(registry()),
            _ => None,
        }
    }
}

/// Whether a slot carries a value or the metadata about a primitive value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Value,
    Sidecar,
}

/// One position in a registry's emission order
#[derive(Debug, Clone)]
pub struct Slot {
    name: String,
    property: PropertyDef,
    role: SlotRole,
    /// For value slots: the paired sidecar. For sidecars: the paired value slot.
    partner: Option<usize>,
}

impl Slot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self) -> &PropertyDef {
        &self.property
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    pub fn is_sidecar(&self) -> bool {
        self.role == SlotRole::Sidecar
    }

    pub fn partner(&self) -> Option<usize> {
        self.partner
    }
}

#[derive(Debug)]
struct Layout {
    slots: Vec<Slot>,
    by_name: HashMap<String, usize>,
}

impl Layout {
    fn build(base: &[PropertyDef], declared: &[PropertyDef]) -> Self {
        let mut slots: Vec<Slot> = Vec::with_capacity((base.len() + declared.len()) * 2);
        let mut by_name = HashMap::new();

        for property in base.iter().chain(declared) {
            if by_name.contains_key(property.name) {
                continue;
            }

            let value_index = slots.len();
            by_name.insert(property.name.to_string(), value_index);
            slots.push(Slot {
                name: property.name.to_string(),
                property: *property,
                role: SlotRole::Value,
                partner: None,
            });

            if property.is_primitive() && property.sidecar {
                let sidecar_index = slots.len();
                let sidecar_name = sidecar_name(property.name);
                by_name.insert(sidecar_name.clone(), sidecar_index);
                slots.push(Slot {
                    name: sidecar_name,
                    property: *property,
                    role: SlotRole::Sidecar,
                    partner: Some(value_index),
                });
                slots[value_index].partner = Some(sidecar_index);
            }
        }

        Self { slots, by_name }
    }
}

/// Ordered property table for one concrete type
pub struct PropertyRegistry {
    type_name: &'static str,
    kind: EntityKind,
    properties: &'static [PropertyDef],
    layout: OnceLock<Layout>,
}

impl PropertyRegistry {
    pub const fn new(
        type_name: &'static str,
        kind: EntityKind,
        properties: &'static [PropertyDef],
    ) -> Self {
        Self {
            type_name,
            kind,
            properties,
            layout: OnceLock::new(),
        }
    }

    fn layout(&self) -> &Layout {
        self.layout
            .get_or_init(|| Layout::build(self.kind.base_properties(), self.properties))
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Discriminator emitted first on serialization, for resources only
    pub fn resource_type(&self) -> Option<&'static str> {
        self.kind.is_resource().then_some(self.type_name)
    }

    /// Properties declared by this type, excluding inherited slots
    pub fn declared_properties(&self) -> &'static [PropertyDef] {
        self.properties
    }

    /// Inherited and declared properties in emission order
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.slots()
            .iter()
            .filter(|slot| !slot.is_sidecar())
            .map(Slot::property)
    }

    /// All slot names including sidecars, in emission order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots().iter().map(Slot::name)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.layout().slots
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.layout().by_name.get(name).copied()
    }

    pub fn slot_at(&self, index: usize) -> Option<&Slot> {
        self.layout().slots.get(index)
    }

    /// Definition of a value property (sidecar names resolve to `None`)
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        let slot = self.slot_at(self.slot(name)?)?;
        (!slot.is_sidecar()).then(|| slot.property())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    /// Members of a choice group in registry order
    pub fn choice_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a PropertyDef> {
        self.properties()
            .filter(move |property| property.choice_of == Some(group))
    }

    /// Distinct choice group names in registry order
    pub fn choice_groups(&self) -> Vec<&'static str> {
        let mut groups: Vec<&'static str> = Vec::new();
        for group in self.properties().filter_map(|property| property.choice_of) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    /// Slots (values and sidecars) of every other member of `name`'s choice group
    pub fn choice_siblings(&self, name: &str) -> Vec<usize> {
        let Some(group) = self.property(name).and_then(|property| property.choice_of) else {
            return Vec::new();
        };

        self.slots()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.property().choice_of == Some(group))
            .filter(|(_, slot)| slot.property().name != name)
            .map(|(index, _)| index)
            .collect()
    }

    /// Properties with a minimum cardinality above zero
    pub fn required_properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties().filter(|property| property.min > 0)
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Sidecar key for a primitive property
pub fn sidecar_name(name: &str) -> String {
    format!("_{}", name)
}

/// Concrete property name for a choice member (`value` + `dateTime` -> `valueDateTime`)
pub fn choice_member_name(group: &str, type_code: &str) -> String {
    format!("{}{}", group, type_code.to_upper_camel_case())
}

/// Type suffix of a choice member (`valueDateTime` in group `value` -> `DateTime`)
pub fn choice_type_suffix<'a>(group: &str, member: &'a str) -> Option<&'a str> {
    member
        .strip_prefix(group)
        .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
}
