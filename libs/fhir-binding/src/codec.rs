//! Canonical-order JSON codec
//!
//! Binding copies registry-listed keys out of a snapshot; everything else is
//! dropped. Emission walks the slots in registry order, so output order is the
//! schema order regardless of how the entity was assembled.
//!
//! Primitive/sidecar pairs:
//! - `name` and `_name` occupy adjacent slots and are bound and emitted together.
//! - A sidecar is emitted only when it carries something (`id` or extensions).
//! - Repeating primitives keep their sidecar as an aligned array with `null` holes.
//!
//! Embedded resources (`contained`, `Bundle.entry.resource`) have no registry of
//! their own at bind time and are emitted exactly as given. Canonical order for
//! them comes from binding them through a [`SchemaCatalog`], e.g.
//! [`Node::bind_resource`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::catalog::SchemaCatalog;
use crate::element::Node;
use crate::error::{Error, Result};
use crate::registry::{PropertyDef, PropertyRegistry, SlotRole};

impl Node {
    /// Bind a snapshot onto a fresh node for `registry`
    ///
    /// Unknown keys are ignored and `null` values are treated as unset. A snapshot
    /// that is not an object yields an empty node.
    pub fn from_json(registry: &'static PropertyRegistry, snapshot: Value) -> Self {
        let mut node = Node::new(registry);

        let Value::Object(map) = snapshot else {
            tracing::debug!(
                type_name = registry.type_name(),
                "snapshot is not an object, binding an empty entity"
            );
            return node;
        };

        for (key, value) in map {
            if key == "resourceType" {
                if value.as_str() != registry.resource_type() {
                    tracing::debug!(
                        type_name = registry.type_name(),
                        found = %value,
                        "ignoring resourceType that does not match the registry"
                    );
                }
                continue;
            }

            let Some(index) = registry.slot(&key) else {
                tracing::debug!(
                    type_name = registry.type_name(),
                    property = %key,
                    "ignoring unknown property"
                );
                continue;
            };

            let Some(slot) = registry.slot_at(index) else {
                continue;
            };

            let bound = match slot.role() {
                SlotRole::Value => bind_value(slot.property(), value),
                SlotRole::Sidecar => (!value.is_null()).then_some(value),
            };

            if let Some(bound) = bound {
                node.insert_slot(index, bound);
            }
        }

        node.enforce_choice_exclusivity();
        node
    }

    /// Parse JSON text and bind it
    pub fn from_json_str(registry: &'static PropertyRegistry, input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        if !value.is_object() {
            return Err(Error::ExpectedObject);
        }
        Ok(Self::from_json(registry, value))
    }

    /// Bind an untyped resource through the registry its `resourceType` names
    pub fn bind_resource(catalog: &dyn SchemaCatalog, snapshot: Value) -> Result<Self> {
        let resource_type = snapshot
            .as_object()
            .ok_or(Error::ExpectedObject)?
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or(Error::MissingResourceType)?;

        let registry = catalog
            .registry(resource_type)
            .ok_or_else(|| Error::UnknownResourceType(resource_type.to_string()))?;

        Ok(Self::from_json(registry, snapshot))
    }

    /// Ordered snapshot of every set property
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();

        if let Some(resource_type) = self.resource_type() {
            map.insert(
                "resourceType".to_string(),
                Value::String(resource_type.to_string()),
            );
        }

        for (name, value) in self.emitted() {
            map.insert(name.to_string(), value.clone());
        }

        map
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.to_map())
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Slots that serialization emits, in order
    fn emitted(&self) -> impl Iterator<Item = (&str, &Value)> {
        let registry = self.registry();
        self.populated_slots().filter_map(move |(index, value)| {
            let slot = registry.slot_at(index)?;
            if slot.is_sidecar() && is_empty_metadata(value) {
                return None;
            }
            Some((slot.name(), value))
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(resource_type) = self.resource_type() {
            map.serialize_entry("resourceType", resource_type)?;
        }
        for (name, value) in self.emitted() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Bind a property value: `null` is unset, nested elements are re-bound through
/// their registry, everything else is copied through
pub(crate) fn bind_value(property: &PropertyDef, value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .map(|item| bind_item(property, item))
                .collect(),
        )),
        other => Some(bind_item(property, other)),
    }
}

/// Bind a single (non-array) value; embedded resources and opaque elements are
/// copied through unchanged
pub(crate) fn bind_item(property: &PropertyDef, value: Value) -> Value {
    match (property.nested_registry(), value) {
        (Some(registry), value @ Value::Object(_)) => Node::from_json(registry, value).to_json(),
        (_, value) => value,
    }
}

/// Whether sidecar metadata carries nothing worth emitting
pub fn is_empty_metadata(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.iter().all(is_empty_metadata),
        _ => false,
    }
}
