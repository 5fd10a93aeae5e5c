//! Run configuration.
//!
//! Every value has a default, so an empty (or absent) configuration file is valid.
//! Keys use kebab-case:
//!
//! ```yaml
//! title: Users API
//! version: 2.1.0
//! default-response-ct: application/json
//! struct-tag: serde
//! map-types:
//!   money.Amount: { type: integer, format: int64 }
//! default-responses:
//!   404: errors.NotFound
//! ```

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Primitive type and format a well-known external type maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedType {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl MappedType {
    fn new(schema_type: &str, format: &str) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            format: Some(format.to_string()),
        }
    }
}

/// Output serializer selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Output {
    Openapi3Yaml,
    Openapi3Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    /// Content type for `Request body:` sections without an explicit one
    pub default_request_ct: String,
    /// Content type for `Response:` sections without an explicit one
    pub default_response_ct: String,
    /// Attribute consulted for serialized field names in body contexts
    pub struct_tag: String,
    /// Extra `package.Name` → primitive mappings, merged over the built-in table
    pub map_types: BTreeMap<String, MappedType>,
    /// Lookup used by `Response <code>: $default`
    pub default_responses: BTreeMap<u16, String>,
    pub json_schema_ref_prefix: String,
    pub output: Output,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            default_request_ct: "application/json".to_string(),
            default_response_ct: "application/json".to_string(),
            struct_tag: "serde".to_string(),
            map_types: BTreeMap::new(),
            default_responses: BTreeMap::new(),
            json_schema_ref_prefix: "#/components/schemas/".to_string(),
            output: Output::Openapi3Yaml,
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Built-in table of well-known external types, with the configured overrides applied.
    pub fn type_map(&self) -> BTreeMap<String, MappedType> {
        let mut map: BTreeMap<String, MappedType> = [
            ("chrono.DateTime", "date-time"),
            ("chrono.NaiveDateTime", "date-time"),
            ("time.OffsetDateTime", "date-time"),
            ("time.PrimitiveDateTime", "date-time"),
            ("jiff.Timestamp", "date-time"),
            ("chrono.NaiveDate", "date"),
            ("time.Date", "date"),
            ("chrono.NaiveTime", "time"),
            ("time.Time", "time"),
            ("uuid.Uuid", "uuid"),
            ("url.Url", "uri"),
            ("rust_decimal.Decimal", "decimal"),
        ]
        .into_iter()
        .map(|(k, f)| (k.to_string(), MappedType::new("string", f)))
        .collect();

        for (k, v) in &self.map_types {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_request_ct, "application/json");
        assert_eq!(config.default_response_ct, "application/json");
        assert_eq!(config.struct_tag, "serde");
        assert_eq!(config.json_schema_ref_prefix, "#/components/schemas/");
        assert_eq!(config.output, Output::Openapi3Yaml);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_yaml("   \n").unwrap();
        assert_eq!(config.title, "API");
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
title: Users API
default-response-ct: text/plain
struct-tag: doc
output: openapi3-json
map-types:
  money.Amount:
    type: integer
    format: int64
default-responses:
  404: errors.NotFound
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.title, "Users API");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.default_response_ct, "text/plain");
        assert_eq!(config.default_request_ct, "application/json");
        assert_eq!(config.struct_tag, "doc");
        assert_eq!(config.output, Output::Openapi3Json);
        assert_eq!(
            config.default_responses.get(&404).map(String::as_str),
            Some("errors.NotFound")
        );

        let map = config.type_map();
        assert_eq!(map["money.Amount"].schema_type, "integer");
        assert_eq!(map["chrono.DateTime"].format.as_deref(), Some("date-time"));
    }

    #[test]
    fn test_override_builtin_mapping() {
        let mut config = Config::default();
        config.map_types.insert(
            "uuid.Uuid".to_string(),
            MappedType {
                schema_type: "string".to_string(),
                format: None,
            },
        );
        assert_eq!(config.type_map()["uuid.Uuid"].format, None);
    }

    #[test]
    fn test_unknown_output_is_rejected() {
        let result = Config::from_yaml("output: html\n");
        assert!(result.is_err());
    }
}
