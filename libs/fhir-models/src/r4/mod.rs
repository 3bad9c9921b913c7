//! FHIR R4 (4.0.1) models

pub mod bundle;
pub mod catalog;
pub mod datatypes;
pub mod observation;
pub mod patient;

pub use bundle::*;
pub use catalog::*;
pub use datatypes::*;
pub use observation::*;
pub use patient::*;
