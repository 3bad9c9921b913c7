//! R4 schema catalog

use ferrum_binding::{FhirVersion, PropertyRegistry, SchemaCatalog};

use super::bundle::BUNDLE;
use super::observation::OBSERVATION;
use super::patient::PATIENT;

/// Resource types with a model in this crate
pub const RESOURCE_TYPES: &[&str] = &["Bundle", "Observation", "Patient"];

/// Resolves R4 resource types to their registries
#[derive(Debug, Clone, Copy, Default)]
pub struct R4Catalog;

impl SchemaCatalog for R4Catalog {
    fn version(&self) -> FhirVersion {
        FhirVersion::R4
    }

    fn registry(&self, resource_type: &str) -> Option<&'static PropertyRegistry> {
        match resource_type {
            "Bundle" => Some(&BUNDLE),
            "Observation" => Some(&OBSERVATION),
            "Patient" => Some(&PATIENT),
            _ => None,
        }
    }

    fn resource_types(&self) -> Vec<&'static str> {
        RESOURCE_TYPES.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_type_resolves() {
        let catalog = R4Catalog;
        for name in catalog.resource_types() {
            let registry = catalog.registry(name).expect("listed type should resolve");
            assert_eq!(registry.resource_type(), Some(name));
        }
        assert!(!catalog.contains("Basic"));
        assert_eq!(catalog.version(), FhirVersion::R4);
    }
}
