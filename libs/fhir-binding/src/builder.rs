//! Builder accumulator
//!
//! A [`Builder`] owns one staging [`Node`] for a single entity type. Fluent calls
//! write into the staging node through the registry; [`Builder::build`] copies it
//! into an immutable entity and leaves the staging node untouched, so a builder can
//! keep producing entities.

use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

use crate::codec::{bind_item, bind_value};
use crate::element::Node;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::extension::Extension;
use crate::registry::SlotRole;
use crate::validation::Validator;

impl Node {
    /// Assign a property; choice members go through the exclusivity rule
    pub(crate) fn set_value(&mut self, name: &str, value: Value) {
        let registry = self.registry();
        let Some(slot) = registry.slot(name).and_then(|index| registry.slot_at(index)) else {
            tracing::warn!(
                type_name = registry.type_name(),
                property = name,
                "ignoring write to unknown property"
            );
            return;
        };

        if slot.is_sidecar() {
            self.set_sidecar_value(slot.property().name, value);
            return;
        }
        if slot.property().choice_of.is_some() {
            self.set_choice(name, value);
            return;
        }

        let Some(index) = registry.slot(name) else {
            return;
        };
        match bind_value(slot.property(), value) {
            Some(bound) => self.insert_slot(index, bound),
            None => {
                self.remove_slot(index);
            }
        }
    }

    /// Append to a repeating property, creating the sequence if absent
    ///
    /// An aligned sidecar array on a repeating primitive is padded with `null` so
    /// positions keep matching.
    pub(crate) fn push_value(&mut self, name: &str, item: Value) {
        let registry = self.registry();
        let Some(index) = registry.slot(name) else {
            tracing::warn!(
                type_name = registry.type_name(),
                property = name,
                "ignoring append to unknown property"
            );
            return;
        };
        let Some(slot) = registry.slot_at(index) else {
            return;
        };
        if slot.role() == SlotRole::Sidecar {
            tracing::warn!(
                type_name = registry.type_name(),
                property = name,
                "ignoring append to a sidecar slot"
            );
            return;
        }

        let property = *slot.property();
        if !property.repeats {
            tracing::debug!(
                type_name = registry.type_name(),
                property = name,
                "appending to a property that does not repeat"
            );
        }
        if property.choice_of.is_some() {
            self.clear_choice_siblings(name);
        }

        // An existing sidecar array fixes the positions new items line up with.
        let aligned = slot.partner().and_then(|sidecar| match self.slot_value(sidecar) {
            Some(Value::Array(metadata)) => Some(metadata.len()),
            _ => None,
        });

        let mut items = match self.remove_slot(index) {
            Some(Value::Array(items)) => items,
            Some(previous) => vec![previous],
            None => Vec::new(),
        };
        if let Some(len) = aligned {
            if items.len() < len {
                items.resize(len, Value::Null);
            }
        }
        items.push(bind_item(&property, item));
        let len = items.len();
        self.insert_slot(index, Value::Array(items));

        if let Some(sidecar) = slot.partner() {
            if let Some(Value::Array(metadata)) = self.slot_value_mut(sidecar) {
                metadata.resize(len, Value::Null);
            }
        }
    }

    /// Replace the sidecar of a primitive property
    ///
    /// Metadata on a choice member selects that member: the rest of its group is
    /// cleared, as with [`Node::set_choice`].
    pub(crate) fn set_sidecar_value(&mut self, name: &str, metadata: Value) {
        let Some((value_name, sidecar)) = self.sidecar_target(name) else {
            return;
        };

        if metadata.is_null() {
            self.remove_slot(sidecar);
            return;
        }
        self.clear_choice_siblings(value_name);
        self.insert_slot(sidecar, metadata);
    }

    /// Append an extension to the sidecar of a single-valued primitive
    pub(crate) fn push_sidecar_extension(&mut self, name: &str, extension: Value) {
        let Some((value_name, sidecar)) = self.sidecar_target(name) else {
            return;
        };
        self.clear_choice_siblings(value_name);

        if !matches!(self.slot_value(sidecar), Some(Value::Object(_))) {
            self.insert_slot(sidecar, Value::Object(Map::new()));
        }
        let Some(Value::Object(metadata)) = self.slot_value_mut(sidecar) else {
            return;
        };

        match metadata.get_mut("extension") {
            Some(Value::Array(extensions)) => extensions.push(extension),
            _ => {
                metadata.insert("extension".to_string(), Value::Array(vec![extension]));
            }
        }
    }

    /// Value property name and sidecar slot for `name` (either `x` or `_x`)
    fn sidecar_target(&self, name: &str) -> Option<(&'static str, usize)> {
        let registry = self.registry();
        let target = registry.slot(name).and_then(|index| {
            let slot = registry.slot_at(index)?;
            let sidecar = if slot.is_sidecar() { index } else { slot.partner()? };
            Some((slot.property().name, sidecar))
        });

        if target.is_none() {
            tracing::warn!(
                type_name = registry.type_name(),
                property = name,
                "property has no sidecar"
            );
        }
        target
    }

    fn clear_choice_siblings(&mut self, name: &str) {
        let registry = self.registry();
        for sibling in registry.choice_siblings(name) {
            self.remove_slot(sibling);
        }
    }

    /// Return a property (not its sidecar) to the unset state
    pub(crate) fn clear_value(&mut self, name: &str) {
        if let Some(index) = self.registry().slot(name) {
            self.remove_slot(index);
        }
    }

    pub(crate) fn clear_sidecar(&mut self, name: &str) {
        self.set_sidecar_value(name, Value::Null);
    }
}

/// Fluent staging accumulator for one entity type
pub struct Builder<E: Entity> {
    staging: Node,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Builder<E> {
    pub fn new() -> Self {
        Self {
            staging: Node::new(E::registry()),
            _entity: PhantomData,
        }
    }

    /// Start from an existing entity's state
    pub fn from_entity(entity: &E) -> Self {
        Self {
            staging: entity.node().clone(),
            _entity: PhantomData,
        }
    }

    /// Assign a property (`setScalar`); choice members clear their siblings
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.staging.set_value(name, value.into());
        self
    }

    /// Append to a repeating property (`addToArray`)
    pub fn add(mut self, name: &str, item: impl Into<Value>) -> Self {
        self.staging.push_value(name, item.into());
        self
    }

    /// Assign one member of a choice group, clearing every other member
    pub fn set_choice(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.staging.set_choice(name, value.into());
        self
    }

    /// Replace the `_name` metadata of a primitive property
    pub fn set_sidecar(mut self, name: &str, metadata: impl Into<Value>) -> Self {
        self.staging.set_sidecar_value(name, metadata.into());
        self
    }

    /// Attach an extension to the `_name` metadata of a primitive property
    pub fn add_sidecar_extension(mut self, name: &str, extension: Extension) -> Self {
        self.staging
            .push_sidecar_extension(name, extension.to_json());
        self
    }

    pub fn clear(mut self, name: &str) -> Self {
        self.staging.clear_value(name);
        self
    }

    pub fn clear_sidecar(mut self, name: &str) -> Self {
        self.staging.clear_sidecar(name);
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.set("id", id.into())
    }

    pub fn extension(self, extension: Extension) -> Self {
        self.add("extension", extension)
    }

    pub fn modifier_extension(self, extension: Extension) -> Self {
        self.add("modifierExtension", extension)
    }

    /// Embed a resource by value in `contained`
    pub fn contained<R: Entity>(self, resource: &R) -> Self {
        self.add("contained", resource.to_json())
    }

    pub fn staging(&self) -> &Node {
        &self.staging
    }

    /// Produce an entity from the current staging state
    pub fn build(&self) -> E {
        E::from_node(self.staging.clone())
    }

    /// Build, then hand the result to `validator`
    ///
    /// Returns [`Error::Validation`] carrying the validator's issues when the
    /// outcome is not valid. Nothing is retried.
    pub async fn build_and_validate(&self, validator: &dyn Validator) -> Result<E> {
        let entity = self.build();
        let outcome = validator.validate(&entity.to_json()).await;

        if outcome.valid {
            tracing::debug!(
                type_name = E::registry().type_name(),
                warnings = outcome.warning_count(),
                "built entity passed validation"
            );
            Ok(entity)
        } else {
            tracing::debug!(
                type_name = E::registry().type_name(),
                errors = outcome.error_count(),
                "built entity failed validation"
            );
            Err(Error::Validation {
                resource_type: E::registry().type_name().to_string(),
                issues: outcome.issues,
            })
        }
    }
}

impl<E: Entity> Default for Builder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for Builder<E> {
    fn clone(&self) -> Self {
        Self {
            staging: self.staging.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Builder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("staging", &self.staging)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_add_preserve_order() {
        let ext = Builder::<Extension>::new()
            .set("valueString", "x")
            .set("url", "http://example.org/a")
            .add("extension", json!({"url": "http://example.org/inner", "valueBoolean": true}))
            .build();

        let keys: Vec<String> = ext.to_json().as_object().map(|m| m.keys().cloned().collect()).unwrap_or_default();
        assert_eq!(keys, vec!["extension", "url", "valueString"]);
    }

    #[test]
    fn test_build_leaves_staging_reusable() {
        let builder = Builder::<Extension>::new().set("url", "http://example.org/a");
        let first = builder.build();
        let second = builder.clone().set("valueCode", "b").build();

        assert_eq!(builder.build(), first);
        assert_ne!(first, second);
        assert_eq!(second.to_json()["valueCode"], "b");
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        let ext = Builder::<Extension>::new()
            .set("url", "http://example.org/a")
            .set("notAProperty", 1)
            .add("alsoMissing", 2)
            .build();
        assert_eq!(ext.to_json(), json!({"url": "http://example.org/a"}));
    }

    #[test]
    fn test_set_null_clears() {
        let ext = Builder::<Extension>::new()
            .set("url", "http://example.org/a")
            .set("url", Value::Null)
            .build();
        assert!(ext.node().is_empty());
    }
}
