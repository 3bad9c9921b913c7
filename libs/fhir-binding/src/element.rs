//! Element base hierarchy
//!
//! FHIR types form a chain `Element -> DataType | BackboneElement -> Resource ->
//! DomainResource`. Instead of an inheritance tree, each level is a slice of slots it
//! contributes; [`EntityKind::base_properties`](crate::EntityKind::base_properties)
//! picks the right slice and the registry lays it out ahead of the type's own
//! properties. [`Node`] is the storage shared by every entity and builder.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::entity::Entity;
use crate::extension::{self, Extension};
use crate::registry::{PropertyDef, PropertyRegistry};

/// Slots of `Element`: identity and extensions
pub(crate) const ELEMENT_BASE: &[PropertyDef] = &[
    PropertyDef::primitive("id").without_sidecar(),
    PropertyDef::complex("extension", extension::extension_registry).many(),
];

/// Slots of `BackboneElement`
pub(crate) const BACKBONE_BASE: &[PropertyDef] = &[
    PropertyDef::primitive("id").without_sidecar(),
    PropertyDef::complex("extension", extension::extension_registry).many(),
    PropertyDef::complex("modifierExtension", extension::extension_registry).many(),
];

/// Slots of `Resource`
pub(crate) const RESOURCE_BASE: &[PropertyDef] = &[
    PropertyDef::primitive("id"),
    PropertyDef::complex("meta", extension::meta_registry),
    PropertyDef::primitive("implicitRules"),
    PropertyDef::primitive("language"),
];

/// Slots of `DomainResource`
pub(crate) const DOMAIN_RESOURCE_BASE: &[PropertyDef] = &[
    PropertyDef::primitive("id"),
    PropertyDef::complex("meta", extension::meta_registry),
    PropertyDef::primitive("implicitRules"),
    PropertyDef::primitive("language"),
    PropertyDef::complex("text", extension::narrative_registry),
    PropertyDef::resource("contained").many(),
    PropertyDef::complex("extension", extension::extension_registry).many(),
    PropertyDef::complex("modifierExtension", extension::extension_registry).many(),
];

/// Registry-ordered property storage
///
/// Values are keyed by slot index, so iteration order is emission order no matter
/// in which order properties were assigned. A slot that is absent is unset.
#[derive(Clone)]
pub struct Node {
    registry: &'static PropertyRegistry,
    values: BTreeMap<usize, Value>,
}

impl Node {
    pub fn new(registry: &'static PropertyRegistry) -> Self {
        Self {
            registry,
            values: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &'static PropertyRegistry {
        self.registry
    }

    pub fn type_name(&self) -> &'static str {
        self.registry.type_name()
    }

    pub fn resource_type(&self) -> Option<&'static str> {
        self.registry.resource_type()
    }

    /// Number of populated slots (values and sidecars)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a property or sidecar slot
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&self.registry.slot(name)?)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Items of a repeating property; empty when unset
    pub fn get_array(&self, name: &str) -> &[Value] {
        self.get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Strings of a repeating primitive property, skipping `null` placeholders
    pub fn get_strings(&self, name: &str) -> Vec<&str> {
        self.get_array(name)
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    /// Nested element bound as a typed entity
    pub fn get_as<T: Entity>(&self, name: &str) -> Option<T> {
        self.get(name)
            .filter(|value| value.is_object())
            .map(|value| T::from_json(value.clone()))
    }

    /// Items of a repeating nested property bound as typed entities
    pub fn get_all<T: Entity>(&self, name: &str) -> Vec<T> {
        self.get_array(name)
            .iter()
            .filter(|value| value.is_object())
            .map(|value| T::from_json(value.clone()))
            .collect()
    }

    /// Sidecar (`_name`) of a primitive property
    pub fn sidecar(&self, name: &str) -> Option<&Value> {
        let slot = self.registry.slot_at(self.registry.slot(name)?)?;
        self.values.get(&slot.partner()?)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn extensions(&self) -> Vec<Extension> {
        self.get_all("extension")
    }

    pub fn modifier_extensions(&self) -> Vec<Extension> {
        self.get_all("modifierExtension")
    }

    /// First extension with the given URL
    pub fn extension_by_url(&self, url: &str) -> Option<Extension> {
        self.get_array("extension")
            .iter()
            .find(|value| value.get("url").and_then(Value::as_str) == Some(url))
            .map(|value| Extension::from_json(value.clone()))
    }

    /// Contained resources as stored (each carries its own `resourceType`)
    pub fn contained_values(&self) -> &[Value] {
        self.get_array("contained")
    }

    /// Populated slots in emission order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().filter_map(|(index, value)| {
            self.registry
                .slot_at(*index)
                .map(|slot| (slot.name(), value))
        })
    }

    pub(crate) fn slot_value(&self, index: usize) -> Option<&Value> {
        self.values.get(&index)
    }

    pub(crate) fn slot_value_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(&index)
    }

    pub(crate) fn insert_slot(&mut self, index: usize, value: Value) {
        self.values.insert(index, value);
    }

    pub(crate) fn remove_slot(&mut self, index: usize) -> Option<Value> {
        self.values.remove(&index)
    }

    pub(crate) fn populated_slots(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.values.iter().map(|(index, value)| (*index, value))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.registry, other.registry) && self.values == other.values
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.registry.type_name())
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}
