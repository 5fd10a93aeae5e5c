//! Data model shared by the directive parser, the schema generator and the
//! output builders.
//!
//! A [`Program`] holds everything discovered during one run: the documented
//! endpoints and the reference table of resolved named types.

use crate::schema_generator::Schema;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// HTTP methods accepted on an endpoint start line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Connect,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "CONNECT" => Ok(HttpMethod::Connect),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(format!("unknown HTTP method {:?}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section a type was first resolved for.
///
/// Decides which attribute names fields and where `{required}` is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefContext {
    Path,
    Query,
    Form,
    RequestBody,
    ResponseBody,
    None,
}

impl RefContext {
    /// Path, query and form types are flattened into parameter lists.
    pub fn is_param_bag(&self) -> bool {
        matches!(self, RefContext::Path | RefContext::Query | RefContext::Form)
    }

    /// Attribute consulted for field names before the body tag.
    pub fn attribute_name(&self) -> Option<&'static str> {
        match self {
            RefContext::Path => Some("path"),
            RefContext::Query => Some("query"),
            RefContext::Form => Some("form"),
            _ => None,
        }
    }
}

impl fmt::Display for RefContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RefContext::Path => "path",
            RefContext::Query => "query",
            RefContext::Form => "form",
            RefContext::RequestBody => "request body",
            RefContext::ResponseBody => "response body",
            RefContext::None => "none",
        };
        f.write_str(name)
    }
}

/// Inclusive numeric bounds from a `{range: min-max}` tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Tags attached to an inline parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTags {
    pub required: bool,
    pub optional: bool,
    pub omitempty: bool,
    pub readonly: bool,
    pub enum_values: Vec<String>,
    pub default: Option<String>,
    pub range: Option<Range>,
    pub format: Option<String>,
    /// Lookup key of a resolved `{$ref: ..}`
    pub reference: Option<String>,
}

/// One inline-declared parameter, e.g. `page: Page number {int, default: 1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub info: String,
    /// Literal type hint such as `string`, `integer` or `[]string`
    pub kind: Option<String>,
    pub tags: ParamTags,
}

/// Either an inline parameter list or a reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    Params(Vec<Param>),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRef {
    pub description: String,
    pub source: ParamSource,
}

impl ParamRef {
    pub fn params(&self) -> Option<&[Param]> {
        match &self.source {
            ParamSource::Params(p) => Some(p),
            ParamSource::Reference(_) => None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match &self.source {
            ParamSource::Reference(r) => Some(r),
            ParamSource::Params(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Content type of the body
    pub content_type: String,
    pub path: Option<ParamRef>,
    pub query: Option<ParamRef>,
    pub form: Option<ParamRef>,
    pub body: Option<ParamRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub content_type: String,
    pub description: String,
    /// `None` for `$empty` responses
    pub body: Option<ParamRef>,
}

/// One documented HTTP operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    pub tags: Vec<String>,
    pub tagline: String,
    pub description: String,
    pub request: Request,
    pub responses: BTreeMap<u16, Response>,
    /// File the comment block came from
    pub file: PathBuf,
    /// Line of the start line in `file`
    pub line: usize,
}

/// A resolved named type.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    /// Canonical module path of the declaring module
    pub package: String,
    pub file: PathBuf,
    /// Key in [`Program::references`]
    pub lookup: String,
    /// Documentation of the declaration
    pub info: String,
    pub context: RefContext,
    /// Direct fields, with their type written out as `kind`
    pub fields: Vec<Param>,
    /// `None` while the fields are still being walked
    pub schema: Option<Schema>,
}

impl Reference {
    pub fn is_complete(&self) -> bool {
        self.schema.is_some()
    }
}

/// Everything discovered in one run.
#[derive(Debug, Default)]
pub struct Program {
    pub endpoints: Vec<Endpoint>,
    pub references: BTreeMap<String, Reference>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(&self, lookup: &str) -> Option<&Reference> {
        self.references.get(lookup)
    }

    /// Register a reference whose schema is not built yet.
    pub(crate) fn insert_placeholder(&mut self, reference: Reference) {
        debug_assert!(reference.schema.is_none());
        self.references.insert(reference.lookup.clone(), reference);
    }

    /// Attach the finished schema to a placeholder.
    pub(crate) fn complete(&mut self, lookup: &str, schema: Schema) {
        if let Some(r) = self.references.get_mut(lookup) {
            r.schema = Some(schema);
        }
    }

    /// Drop a reference that could not be built, along with every finished
    /// reference whose schema points at it.
    pub(crate) fn discard(&mut self, lookup: &str) {
        let mut pending = vec![lookup.to_string()];
        while let Some(key) = pending.pop() {
            if self.references.remove(&key).is_none() {
                continue;
            }
            pending.extend(
                self.references
                    .values()
                    .filter(|r| r.schema.as_ref().is_some_and(|s| s.mentions(&key)))
                    .map(|r| r.lookup.clone()),
            );
        }
    }

    /// Order endpoints by tags, then method, then path.
    pub fn sort_endpoints(&mut self) {
        self.endpoints.sort_by(|a, b| {
            a.tags
                .cmp(&b.tags)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
                .then_with(|| a.path.cmp(&b.path))
        });
    }
}
