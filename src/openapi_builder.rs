use crate::config::Config;
use crate::program::{Endpoint, HttpMethod, Param, ParamRef, ParamSource, Program};
use crate::schema_generator::{Schema, SchemaKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Prefix of every `$ref` into the components section
    ref_prefix: String,
    /// Paths collection (URL path -> PathItem)
    paths: BTreeMap<String, PathItem>,
    /// Lookups emitted as `$ref`, to be written under components
    used: BTreeSet<String>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Slot for `method`; OpenAPI 3 has none for CONNECT.
    fn slot(&mut self, method: HttpMethod) -> Option<&mut Option<Operation>> {
        match method {
            HttpMethod::Get => Some(&mut self.get),
            HttpMethod::Put => Some(&mut self.put),
            HttpMethod::Post => Some(&mut self.post),
            HttpMethod::Delete => Some(&mut self.delete),
            HttpMethod::Options => Some(&mut self.options),
            HttpMethod::Head => Some(&mut self.head),
            HttpMethod::Patch => Some(&mut self.patch),
            HttpMethod::Trace => Some(&mut self.trace),
            HttpMethod::Connect => None,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation summary, from the tagline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters (path, query)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Status code -> response
    pub responses: BTreeMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query)
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub schema: SchemaObject,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: SchemaObject,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// OpenAPI Schema object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaObject {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaObject>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaObject>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub schemas: BTreeMap<String, SchemaObject>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// Render a whole program with the settings in `config`.
pub fn build_document(program: &Program, config: &Config) -> OpenApiDocument {
    let mut builder = OpenApiBuilder::from_config(config);
    for endpoint in &program.endpoints {
        builder.add_endpoint(endpoint, program);
    }
    builder.build(program)
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self::from_config(&Config::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            info: Info {
                title: config.title.clone(),
                version: config.version.clone(),
                description: config.description.clone(),
            },
            ref_prefix: config.json_schema_ref_prefix.clone(),
            paths: BTreeMap::new(),
            used: BTreeSet::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Add one endpoint as an operation.
    ///
    /// `program` supplies the schemas of the types the endpoint refers to.
    pub fn add_endpoint(&mut self, endpoint: &Endpoint, program: &Program) {
        debug!("Adding endpoint: {} {}", endpoint.method, endpoint.path);

        let openapi_path = Self::convert_path_format(&endpoint.path);
        let request = &endpoint.request;

        let mut parameters = Vec::new();
        if let Some(path) = &request.path {
            parameters.extend(self.parameters(path, "path", program));
        }
        if let Some(query) = &request.query {
            parameters.extend(self.parameters(query, "query", program));
        }

        let mut content = BTreeMap::new();
        let mut body_description = None;
        if let Some(form) = &request.form {
            let schema = self.inline_schema(form, program);
            content.insert(FORM_CONTENT_TYPE.to_string(), MediaType { schema });
        }
        if let Some(body) = &request.body {
            let schema = self.body_schema(body);
            body_description = non_empty(&body.description);
            content.insert(request.content_type.clone(), MediaType { schema });
        }
        let request_body = (!content.is_empty()).then(|| RequestBody {
            description: body_description,
            required: true,
            content,
        });

        let responses = endpoint
            .responses
            .iter()
            .map(|(code, response)| {
                let content = response.body.as_ref().map(|body| {
                    let schema = self.body_schema(body);
                    BTreeMap::from([(response.content_type.clone(), MediaType { schema })])
                });
                (
                    code.to_string(),
                    Response {
                        description: response.description.clone(),
                        content,
                    },
                )
            })
            .collect();

        let operation = Operation {
            tags: endpoint.tags.clone(),
            summary: non_empty(&endpoint.tagline),
            description: non_empty(&endpoint.description),
            parameters,
            request_body,
            responses,
        };

        let path_item = self.paths.entry(openapi_path.clone()).or_default();
        match path_item.slot(endpoint.method) {
            Some(slot) => {
                if slot.is_some() {
                    warn!(
                        "{} {} is documented more than once; keeping the last ({}:{})",
                        endpoint.method,
                        openapi_path,
                        endpoint.file.display(),
                        endpoint.line
                    );
                }
                *slot = Some(operation);
            }
            None => warn!(
                "OpenAPI 3 has no {} operation; skipping {} ({}:{})",
                endpoint.method,
                openapi_path,
                endpoint.file.display(),
                endpoint.line
            ),
        }
    }

    /// Convert `:param` path segments to OpenAPI `{param}` format
    fn convert_path_format(path: &str) -> String {
        path.split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Build the final OpenAPI document
    pub fn build(mut self, program: &Program) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let mut schemas = BTreeMap::new();
        let mut done = BTreeSet::new();
        // Rendering a component can reference further components
        while let Some(lookup) = self.used.iter().find(|k| !done.contains(*k)).cloned() {
            done.insert(lookup.clone());
            let Some(reference) = program.reference(&lookup) else {
                warn!("No type recorded for {}; its $ref will dangle", lookup);
                continue;
            };
            let Some(schema) = &reference.schema else {
                warn!("Type {} was never completed; skipping it", lookup);
                continue;
            };
            let mut object = self.schema_object(schema);
            if object.description.is_none() {
                object.description = non_empty(&reference.info);
            }
            schemas.insert(component_name(&lookup), object);
        }

        OpenApiDocument {
            openapi: "3.0.3".to_string(),
            info: self.info,
            paths: self.paths,
            components: (!schemas.is_empty()).then_some(Components { schemas }),
        }
    }

    /// Parameters of a Path or Query section; references are expanded per property.
    fn parameters(&mut self, param_ref: &ParamRef, location: &str, program: &Program) -> Vec<Parameter> {
        let always_required = location == "path";
        match &param_ref.source {
            ParamSource::Params(params) => params
                .iter()
                .map(|p| Parameter {
                    name: p.name.clone(),
                    location: location.to_string(),
                    description: non_empty(&p.info),
                    required: always_required || p.tags.required,
                    schema: self.schema_object(&param_schema(p)),
                })
                .collect(),
            ParamSource::Reference(lookup) => {
                let Some(schema) = program.reference(lookup).and_then(|r| r.schema.as_ref()) else {
                    warn!("No type recorded for {} parameters {}", location, lookup);
                    return Vec::new();
                };
                let Some(properties) = schema.properties() else {
                    warn!("{} parameters {} are not an object", location, lookup);
                    return Vec::new();
                };
                properties
                    .iter()
                    .map(|(name, property)| {
                        let required = always_required
                            || property.required.iter().any(|r| r == name)
                            || schema.required.iter().any(|r| r == name);
                        let mut object = self.schema_object(property);
                        let description = object.description.take();
                        Parameter {
                            name: name.clone(),
                            location: location.to_string(),
                            description,
                            required,
                            schema: object,
                        }
                    })
                    .collect()
            }
        }
    }

    /// A request or response body: a `$ref`, or an inline object for parameter lists.
    fn body_schema(&mut self, body: &ParamRef) -> SchemaObject {
        match &body.source {
            ParamSource::Reference(lookup) => self.schema_object(&Schema::reference(lookup.clone())),
            ParamSource::Params(params) => self.schema_object(&params_schema(params)),
        }
    }

    /// A Form section, always written out in place.
    fn inline_schema(&mut self, form: &ParamRef, program: &Program) -> SchemaObject {
        match &form.source {
            ParamSource::Params(params) => self.schema_object(&params_schema(params)),
            ParamSource::Reference(lookup) => match program.reference(lookup).and_then(|r| r.schema.as_ref()) {
                Some(schema) => self.schema_object(schema),
                None => {
                    warn!("No type recorded for form {}", lookup);
                    SchemaObject {
                        schema_type: Some("object".to_string()),
                        ..Default::default()
                    }
                }
            },
        }
    }

    fn schema_object(&mut self, schema: &Schema) -> SchemaObject {
        let mut object = SchemaObject {
            description: non_empty(&schema.description),
            ..Default::default()
        };

        match &schema.kind {
            SchemaKind::Reference(lookup) => {
                self.used.insert(lookup.clone());
                object.reference = Some(format!("{}{}", self.ref_prefix, component_name(lookup)));
                return object;
            }
            SchemaKind::Primitive(t) => object.schema_type = Some(t.clone()),
            SchemaKind::Object(properties) => {
                object.schema_type = Some("object".to_string());
                if !properties.is_empty() {
                    object.properties = Some(
                        properties
                            .iter()
                            .map(|(name, p)| (name.clone(), self.schema_object(p)))
                            .collect(),
                    );
                }
                object.required = schema
                    .required
                    .iter()
                    .filter(|r| properties.contains_key(*r))
                    .cloned()
                    .collect();
            }
            SchemaKind::Array(items) => {
                object.schema_type = Some("array".to_string());
                object.items = Some(Box::new(self.schema_object(items)));
            }
        }

        let value_type = match &schema.kind {
            SchemaKind::Array(items) => items.schema_type(),
            _ => schema.schema_type(),
        };
        object.format = schema.format.clone();
        if !schema.enum_values.is_empty() {
            object.enum_values = Some(
                schema
                    .enum_values
                    .iter()
                    .map(|v| typed_value(value_type, v))
                    .collect(),
            );
        }
        object.default = schema.default.as_deref().map(|v| typed_value(schema.schema_type(), v));
        object.minimum = schema.minimum;
        object.maximum = schema.maximum;
        object.read_only = schema.read_only.then_some(true);
        object
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Component key for a lookup, limited to `[A-Za-z0-9._-]`.
pub fn component_name(lookup: &str) -> String {
    lookup
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Convert a default or enum value written in a comment to the schema's type.
///
/// Values that don't parse stay strings.
fn typed_value(schema_type: Option<&str>, raw: &str) -> Value {
    let parsed = match schema_type {
        Some("integer") => raw.parse::<i64>().ok().map(Value::from),
        Some("number") => raw.parse::<f64>().ok().map(Value::from),
        Some("boolean") => raw.parse::<bool>().ok().map(Value::from),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn kind_schema(kind: &str) -> Schema {
    match kind.strip_prefix("[]") {
        Some(inner) => Schema::array(kind_schema(inner)),
        None => Schema::primitive(kind, None),
    }
}

/// Schema of an inline parameter; untyped parameters are strings.
fn param_schema(param: &Param) -> Schema {
    let tags = &param.tags;
    let mut schema = match &tags.reference {
        Some(lookup) => Schema::reference(lookup.clone()),
        None => kind_schema(param.kind.as_deref().unwrap_or("string")),
    };
    schema.format = tags.format.clone();
    schema.enum_values = tags.enum_values.clone();
    schema.default = tags.default.clone();
    if let Some(range) = tags.range {
        schema.minimum = range.min;
        schema.maximum = range.max;
    }
    schema.read_only = tags.readonly;
    schema
}

/// An object with one property per inline parameter.
fn params_schema(params: &[Param]) -> Schema {
    let mut schema = Schema::object(
        params
            .iter()
            .map(|p| {
                let mut property = param_schema(p);
                property.description = p.info.clone();
                (p.name.clone(), property)
            })
            .collect(),
    );
    schema.required = params
        .iter()
        .filter(|p| p.tags.required)
        .map(|p| p.name.clone())
        .collect();
    schema
}
