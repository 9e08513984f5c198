//! Engine configuration via `metalayer.toml`
//!
//! The engine itself reads no files during a merge; callers load this once
//! and pass it to [`Overlay::new`](crate::overlay::Overlay::new).

use metalayer_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "metalayer.toml";

/// Default maximum complex-type nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// What the engine does when it meets a type or key the schema lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSchemaPolicy {
    /// Fail with `UnknownType` / `UnknownAttribute`
    #[default]
    Strict,
    /// Log a warning and skip the attribute
    Lenient,
}

/// Engine configuration loaded from `metalayer.toml`.
///
/// # Example
///
/// ```toml
/// unknown_schema = "strict"
/// max_depth = 32
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Handling of unresolvable type names and registry keys.
    #[serde(default)]
    pub unknown_schema: UnknownSchemaPolicy,
    /// Maximum complex-type nesting the engine recurses through.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_schema: UnknownSchemaPolicy::default(),
            max_depth: default_max_depth(),
        }
    }
}

impl EngineConfig {
    /// Lenient variant of the default config.
    pub fn lenient() -> Self {
        Self {
            unknown_schema: UnknownSchemaPolicy::Lenient,
            ..Self::default()
        }
    }

    /// True when unknown types and keys are skipped instead of raised.
    pub fn is_lenient(&self) -> bool {
        self.unknown_schema == UnknownSchemaPolicy::Lenient
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_depth` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# metalayer engine configuration
#
# Handling of type names and registry keys the schema does not know:
#   "strict"  = fail the merge with UnknownType / UnknownAttribute (default)
#   "lenient" = log a warning and skip the attribute
unknown_schema = "strict"

# Maximum complex-type nesting depth merge/init/copy will recurse through.
# Guards against self-referential complex types.
max_depth = 32
"#
    }
}
