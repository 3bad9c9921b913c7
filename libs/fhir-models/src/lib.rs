//! FHIR data models
//!
//! Typed R4 entities built on `ferrum-binding`. Each type is a static property
//! registry plus typed accessors and builder setters; binding, canonical
//! serialization, choice handling and immutable updates come from the engine.
//!
//! # Module Organization
//!
//! - `r4`: data types, Patient, Observation, Bundle and the [`R4Catalog`]
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::{HumanName, Patient};
//! use ferrum_binding::Entity;
//!
//! let patient = Patient::builder()
//!     .gender("female")
//!     .name(HumanName::builder().family("Levin").given("Henry").build())
//!     .id("example")
//!     .build();
//!
//! assert_eq!(
//!     patient.to_json_string().unwrap(),
//!     r#"{"resourceType":"Patient","id":"example","name":[{"family":"Levin","given":["Henry"]}],"gender":"female"}"#
//! );
//! ```

pub mod error;
pub mod r4;

pub use error::{Error, Result};
pub use r4::*;

pub use ferrum_binding::{Entity, Extension, ExtensionValue, Meta, Narrative};
