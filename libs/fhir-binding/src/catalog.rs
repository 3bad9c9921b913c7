//! Resource type lookup
//!
//! A [`SchemaCatalog`] maps `resourceType` names to registries for one FHIR
//! release. Model crates provide one catalog per release they ship.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::registry::PropertyRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FhirVersion {
    R4,
    R4B,
    R5,
}

impl FhirVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "R4",
            FhirVersion::R4B => "R4B",
            FhirVersion::R5 => "R5",
        }
    }

    /// Release number as used in package versions
    pub fn release(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R4B => "4.3.0",
            FhirVersion::R5 => "5.0.0",
        }
    }
}

impl Default for FhirVersion {
    fn default() -> Self {
        Self::R4
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FhirVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "R4" | "4.0" | "4.0.1" => Ok(FhirVersion::R4),
            "R4B" | "4.3" | "4.3.0" => Ok(FhirVersion::R4B),
            "R5" | "5.0" | "5.0.0" => Ok(FhirVersion::R5),
            other => Err(format!("unsupported FHIR version: {}", other)),
        }
    }
}

pub trait SchemaCatalog: Send + Sync {
    fn version(&self) -> FhirVersion;

    fn registry(&self, resource_type: &str) -> Option<&'static PropertyRegistry>;

    /// Resource type names this catalog knows, sorted
    fn resource_types(&self) -> Vec<&'static str>;

    fn contains(&self, resource_type: &str) -> bool {
        self.registry(resource_type).is_some()
    }
}

/// Catalog over a fixed set of registries
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    version: FhirVersion,
    registries: HashMap<&'static str, &'static PropertyRegistry>,
}

impl StaticCatalog {
    /// Registries that are not resources are skipped
    pub fn new(version: FhirVersion, registries: Vec<&'static PropertyRegistry>) -> Self {
        let registries = registries
            .into_iter()
            .filter_map(|registry| registry.resource_type().map(|name| (name, registry)))
            .collect();
        Self {
            version,
            registries,
        }
    }
}

impl SchemaCatalog for StaticCatalog {
    fn version(&self) -> FhirVersion {
        self.version
    }

    fn registry(&self, resource_type: &str) -> Option<&'static PropertyRegistry> {
        self.registries.get(resource_type).copied()
    }

    fn resource_types(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.registries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
