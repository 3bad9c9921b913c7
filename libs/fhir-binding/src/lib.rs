//! Registry-driven FHIR data binding
//!
//! Every FHIR type is described by a static [`PropertyRegistry`] listing its
//! properties in schema order. A single [`Node`] representation interprets the
//! registry to provide:
//!
//! - Binding from JSON snapshots, ignoring unknown keys
//! - Serialization in canonical registry order, with `_name` sidecars next to their primitive
//! - Exclusive choice groups (`value[x]`)
//! - A fluent [`Builder`] with an optional [`Validator`] gate
//!
//! Concrete types are declared with [`fhir_entity!`] and get the shared behaviour
//! through the [`Entity`] trait.
//!
//! ```ignore
//! let ext = Extension::builder()
//!     .set("url", "http://example.org/flag")
//!     .set("valueBoolean", true)
//!     .build();
//! assert_eq!(ext.to_json_string()?, r#"{"url":"http://example.org/flag","valueBoolean":true}"#);
//! ```

pub mod builder;
pub mod catalog;
pub mod choice;
pub mod codec;
pub mod element;
pub mod entity;
pub mod error;
pub mod extension;
pub mod registry;
pub mod validation;

pub use builder::Builder;
pub use catalog::{FhirVersion, SchemaCatalog, StaticCatalog};
pub use codec::is_empty_metadata;
pub use element::Node;
pub use entity::Entity;
pub use error::{Error, Result};
pub use extension::{
    Extension, ExtensionBuilder, ExtensionValue, Meta, MetaBuilder, Narrative, NarrativeBuilder,
};
pub use registry::{
    choice_member_name, choice_type_suffix, sidecar_name, EntityKind, PropertyDef, PropertyRegistry,
    PropertyShape, RegistryFn, Slot, SlotRole,
};
pub use validation::{
    CardinalityValidator, IssueCode, IssueSeverity, ValidationIssue, ValidationOutcome,
    ValidationPlan, Validator, ValidatorConfig,
};

pub use serde_json::Value;

#[doc(hidden)]
pub use serde;
