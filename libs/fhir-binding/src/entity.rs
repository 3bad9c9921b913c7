//! Typed entities
//!
//! Concrete FHIR types are thin newtypes over [`Node`] declared with
//! [`fhir_entity!`](crate::fhir_entity). The [`Entity`] trait supplies construction
//! from snapshots, canonical serialization and the immutable update helpers; the
//! per-type code only adds typed accessors.

use serde_json::{Map, Value};

use crate::element::Node;
use crate::error::{Error, Result};
use crate::registry::PropertyRegistry;

pub trait Entity: Sized + Clone {
    /// Property table for this type
    fn registry() -> &'static PropertyRegistry;

    fn from_node(node: Node) -> Self;

    fn node(&self) -> &Node;

    fn into_node(self) -> Node;

    /// Bind a (possibly partial) snapshot; unknown keys are ignored
    fn from_json(snapshot: Value) -> Self {
        Self::from_node(Node::from_json(Self::registry(), snapshot))
    }

    /// Parse JSON text; a resource whose `resourceType` names another type is rejected
    fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        let object = value.as_object().ok_or(Error::ExpectedObject)?;

        if let Some(expected) = Self::registry().resource_type() {
            match object.get("resourceType").and_then(Value::as_str) {
                Some(found) if found != expected => {
                    return Err(Error::ResourceTypeMismatch {
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(Self::from_json(value))
    }

    fn to_json(&self) -> Value {
        self.node().to_json()
    }

    fn to_map(&self) -> Map<String, Value> {
        self.node().to_map()
    }

    fn to_json_string(&self) -> Result<String> {
        self.node().to_json_string()
    }

    fn to_json_string_pretty(&self) -> Result<String> {
        self.node().to_json_string_pretty()
    }

    /// New entity from this one's snapshot with `changes` laid over it
    ///
    /// Top-level keys in `changes` replace the snapshot's wholesale; nested values
    /// are not merged. A change to a choice member removes the other members of
    /// its group first, and a `null` change clears the key. `self` is untouched.
    fn with(&self, changes: Value) -> Self {
        let Value::Object(changes) = changes else {
            tracing::debug!(
                type_name = Self::registry().type_name(),
                "ignoring non-object changes"
            );
            return self.clone();
        };

        let registry = Self::registry();
        let mut snapshot = self.to_map();

        for (key, value) in changes {
            let is_choice = registry
                .property(&key)
                .is_some_and(|property| property.choice_of.is_some());
            if is_choice {
                for sibling in registry.choice_siblings(&key) {
                    if let Some(slot) = registry.slot_at(sibling) {
                        snapshot.remove(slot.name());
                    }
                }
            }
            snapshot.insert(key, value);
        }

        Self::from_json(Value::Object(snapshot))
    }

    /// `with` whose overlay is computed from the current snapshot
    fn apply_transform<F>(&self, transform: F) -> Self
    where
        F: FnOnce(&Map<String, Value>) -> Map<String, Value>,
    {
        let overlay = transform(&self.to_map());
        self.with(Value::Object(overlay))
    }

    /// Independent copy rebuilt from the serialized snapshot
    fn deep_clone(&self) -> Self {
        Self::from_json(self.to_json())
    }

    fn id(&self) -> Option<&str> {
        self.node().id()
    }

    /// Contained resources of type `R`, in order
    fn contained<R: Entity>(&self) -> Vec<R> {
        let Some(resource_type) = R::registry().resource_type() else {
            return Vec::new();
        };
        self.node()
            .contained_values()
            .iter()
            .filter(|value| value.get("resourceType").and_then(Value::as_str) == Some(resource_type))
            .map(|value| R::from_json(value.clone()))
            .collect()
    }
}

/// Declare a typed entity and its builder over a registry
///
/// ```ignore
/// fhir_entity! {
///     /// A coded value
///     pub struct Coding => CODING;
///     pub builder CodingBuilder;
/// }
/// ```
///
/// The entity gets `Entity`, `Clone`, `PartialEq`, `Debug`, `Serialize`,
/// `Deserialize` and `From<_> for Value`. The builder forwards the generic
/// accumulator operations so per-type setters can be layered on top.
#[macro_export]
macro_rules! fhir_entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $registry:path;
        $(#[$builder_meta:meta])*
        $builder_vis:vis builder $builder:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name($crate::Node);

        impl $crate::Entity for $name {
            fn registry() -> &'static $crate::PropertyRegistry {
                &$registry
            }

            fn from_node(node: $crate::Node) -> Self {
                Self(node)
            }

            fn node(&self) -> &$crate::Node {
                &self.0
            }

            fn into_node(self) -> $crate::Node {
                self.0
            }
        }

        impl $name {
            pub fn builder() -> $builder {
                $builder::new()
            }

            /// Builder seeded with this entity's state
            pub fn to_builder(&self) -> $builder {
                $builder($crate::Builder::from_entity(self))
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                <Self as $crate::Entity>::from_node($crate::Node::new(&$registry))
            }
        }

        impl ::std::convert::From<$name> for $crate::Value {
            fn from(entity: $name) -> Self {
                $crate::Entity::to_json(&entity)
            }
        }

        impl ::std::convert::From<&$name> for $crate::Value {
            fn from(entity: &$name) -> Self {
                $crate::Entity::to_json(entity)
            }
        }

        impl $crate::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::serde::Serializer,
            {
                $crate::serde::Serialize::serialize(&self.0, serializer)
            }
        }

        impl<'de> $crate::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::serde::Deserializer<'de>,
            {
                let value = <$crate::Value as $crate::serde::Deserialize>::deserialize(deserializer)?;
                Ok(<Self as $crate::Entity>::from_json(value))
            }
        }

        $(#[$builder_meta])*
        #[derive(Debug, Clone, Default)]
        $builder_vis struct $builder($crate::Builder<$name>);

        #[allow(dead_code)]
        impl $builder {
            pub fn new() -> Self {
                Self($crate::Builder::new())
            }

            pub fn set(self, name: &str, value: impl Into<$crate::Value>) -> Self {
                Self(self.0.set(name, value))
            }

            pub fn add(self, name: &str, item: impl Into<$crate::Value>) -> Self {
                Self(self.0.add(name, item))
            }

            pub fn set_choice(self, name: &str, value: impl Into<$crate::Value>) -> Self {
                Self(self.0.set_choice(name, value))
            }

            pub fn set_sidecar(self, name: &str, metadata: impl Into<$crate::Value>) -> Self {
                Self(self.0.set_sidecar(name, metadata))
            }

            pub fn add_sidecar_extension(self, name: &str, extension: $crate::Extension) -> Self {
                Self(self.0.add_sidecar_extension(name, extension))
            }

            pub fn clear(self, name: &str) -> Self {
                Self(self.0.clear(name))
            }

            pub fn clear_sidecar(self, name: &str) -> Self {
                Self(self.0.clear_sidecar(name))
            }

            pub fn id(self, id: impl Into<String>) -> Self {
                Self(self.0.id(id))
            }

            pub fn extension(self, extension: $crate::Extension) -> Self {
                Self(self.0.extension(extension))
            }

            pub fn modifier_extension(self, extension: $crate::Extension) -> Self {
                Self(self.0.modifier_extension(extension))
            }

            pub fn contained<R: $crate::Entity>(self, resource: &R) -> Self {
                Self(self.0.contained(resource))
            }

            pub fn staging(&self) -> &$crate::Node {
                self.0.staging()
            }

            pub fn build(&self) -> $name {
                self.0.build()
            }

            pub async fn build_and_validate(
                &self,
                validator: &dyn $crate::Validator,
            ) -> $crate::Result<$name> {
                self.0.build_and_validate(validator).await
            }
        }

        impl ::std::convert::From<$crate::Builder<$name>> for $builder {
            fn from(builder: $crate::Builder<$name>) -> Self {
                Self(builder)
            }
        }
    };
}
