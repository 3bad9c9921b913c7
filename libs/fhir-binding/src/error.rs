use thiserror::Error;

use crate::validation::ValidationIssue;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed for {resource_type}: {} issue(s)", .issues.len())]
    Validation {
        resource_type: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("Expected a JSON object")]
    ExpectedObject,

    #[error("Missing resourceType")]
    MissingResourceType,

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Resource type mismatch: expected {expected}, found {found}")]
    ResourceTypeMismatch { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    /// Issues reported by the validator, empty for every other variant
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            Error::Validation { issues, .. } => issues,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
