//! Rendering OpenAPI documents as YAML or JSON and writing them out.

use crate::config::Output;
use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::config::Config;
/// use openapi_from_comments::openapi_builder::build_document;
/// use openapi_from_comments::program::Program;
/// use openapi_from_comments::serializer::serialize_yaml;
///
/// let doc = build_document(&Program::new(), &Config::default());
/// println!("{}", serialize_yaml(&doc).unwrap());
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to pretty-printed JSON.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Serialize with the configured output format.
pub fn serialize(doc: &OpenApiDocument, output: Output) -> Result<String> {
    match output {
        Output::Openapi3Yaml => serialize_yaml(doc),
        Output::Openapi3Json => serialize_json(doc),
    }
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi_builder::{
        Components, Info, MediaType, Operation, PathItem, Response, SchemaObject,
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_document() -> OpenApiDocument {
        let user = SchemaObject {
            schema_type: Some("object".to_string()),
            properties: Some(BTreeMap::from([(
                "id".to_string(),
                SchemaObject {
                    schema_type: Some("integer".to_string()),
                    format: Some("int64".to_string()),
                    ..Default::default()
                },
            )])),
            required: vec!["id".to_string()],
            ..Default::default()
        };
        let get = Operation {
            tags: vec!["users".to_string()],
            summary: Some("Fetch a user.".to_string()),
            description: None,
            parameters: Vec::new(),
            request_body: None,
            responses: BTreeMap::from([(
                "200".to_string(),
                Response {
                    description: "OK".to_string(),
                    content: Some(BTreeMap::from([(
                        "application/json".to_string(),
                        MediaType {
                            schema: SchemaObject {
                                reference: Some("#/components/schemas/models.User".to_string()),
                                ..Default::default()
                            },
                        },
                    )])),
                },
            )]),
        };

        OpenApiDocument {
            openapi: "3.0.3".to_string(),
            info: Info {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            paths: BTreeMap::from([(
                "/users/{id}".to_string(),
                PathItem {
                    get: Some(get),
                    ..Default::default()
                },
            )]),
            components: Some(Components {
                schemas: BTreeMap::from([("models.User".to_string(), user)]),
            }),
        }
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();
        assert!(yaml.starts_with("openapi:"));
        assert!(yaml.contains("$ref:"));
        assert!(yaml.contains("#/components/schemas/models.User"));
        assert!(yaml.contains("format: int64"));
        // Empty and unset fields are left out
        assert!(!yaml.contains("requestBody"));
        assert!(!yaml.contains("parameters"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_document()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["paths"]["/users/{id}"]["get"]["tags"][0], "users");
        assert_eq!(
            value["components"]["schemas"]["models.User"]["required"],
            serde_json::json!(["id"])
        );
        assert!(json.contains("\n  \"info\""));
    }

    #[test]
    fn test_serialize_by_output() {
        let doc = create_test_document();
        assert!(serialize(&doc, Output::Openapi3Json).unwrap().starts_with('{'));
        assert!(serialize(&doc, Output::Openapi3Yaml).unwrap().starts_with("openapi:"));
    }

    #[test]
    fn test_yaml_round_trip() {
        let doc = create_test_document();
        let yaml = serialize_yaml(&doc).unwrap();
        let back: OpenApiDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/docs/openapi.yaml");

        write_to_file("first", &path).unwrap();
        write_to_file("second", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
