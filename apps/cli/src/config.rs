//! CLI configuration
//!
//! Defaults, then the optional `--config` file (YAML, TOML or JSON by extension),
//! then `FERRUM__*` environment variables such as `FERRUM__VALIDATION__FAIL_FAST`.

use anyhow::{Context, Result};
use ferrum_binding::ValidatorConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub validation: ValidatorConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("FERRUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| match path {
                Some(path) => format!("loading configuration from {}", path.display()),
                None => "loading configuration".to_string(),
            })?;

        settings
            .try_deserialize()
            .context("invalid configuration")
    }
}
