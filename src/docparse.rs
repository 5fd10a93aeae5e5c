//! Endpoint directives in doc comments.
//!
//! A comment documents one or more endpoints when its first line is a
//! method and a path:
//!
//! ```text
//! POST /users users
//! Create a user.
//!
//! The name must be unique.
//!
//! Request body:
//!   $ref: CreateUser
//!
//! Response 201:
//!   $ref: User
//! Response 409: $empty
//! ```
//!
//! Comments that don't start this way are left alone.

use crate::blocks::{get_blocks, is_header, DESC};
use crate::collector::Session;
use crate::error::{Error, LocatedError, Result};
use crate::parser::{dedent, DocComment};
use crate::program::{
    Endpoint, HttpMethod, Param, ParamRef, ParamSource, ParamTags, RefContext, Request, Response,
};
use crate::tags::{format_keyword, parse_range, parse_tags, split_tag};
use crate::type_resolver::FileScope;
use http::StatusCode;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

static START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|HEAD|POST|PUT|PATCH|DELETE|CONNECT|OPTIONS|TRACE) (/\S*)( .*)?$")
        .expect("valid start line regex")
});

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Path|Query|Form):$").expect("valid section regex"));

static REQUEST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Request body( \(([^)]+)\))?:$").expect("valid request regex"));

static RESPONSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Response( (\d{3}))?( \(([^)]+)\))?:$").expect("valid response regex")
});

static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][\w.\-\[\]]*):(?:\s+(.*))?$").expect("valid param regex"));

static BARE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_]\w*(?:(?:::|\.)[A-Za-z_]\w*)*(?:<[\w:.,<> ]+>)?$")
        .expect("valid reference regex")
});

/// Parse a doc comment and check every endpoint has a response.
///
/// Returns no endpoints for comments that aren't directives.
pub fn parse_comment(
    session: &mut Session,
    comment: &DocComment,
    file: &Path,
    scope: Option<&FileScope>,
) -> std::result::Result<Vec<Endpoint>, LocatedError> {
    let endpoints = parse_directives(session, comment, file, scope)?;
    for endpoint in &endpoints {
        if endpoint.responses.is_empty() {
            return Err(LocatedError {
                path: file.to_path_buf(),
                line: endpoint.line,
                error: Error::NoResponse,
            });
        }
    }
    Ok(endpoints)
}

/// Parse a doc comment into endpoints without the response check.
pub fn parse_directives(
    session: &mut Session,
    comment: &DocComment,
    file: &Path,
    scope: Option<&FileScope>,
) -> std::result::Result<Vec<Endpoint>, LocatedError> {
    let lines: Vec<&str> = comment.text.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    if !START_RE.is_match(lines[first]) {
        return Ok(Vec::new());
    }

    // `relative` is 1-based within the comment
    let locate = |relative: usize, error: Error| LocatedError {
        path: file.to_path_buf(),
        line: comment.line + relative - 1,
        error,
    };

    let mut starts = Vec::new();
    let mut i = first;
    while let Some(caps) = lines.get(i).and_then(|l| START_RE.captures(l)) {
        let method: HttpMethod = caps[1]
            .parse()
            .map_err(|e: String| locate(i + 1, Error::Syntax(e)))?;
        let tags: Vec<String> = caps
            .get(3)
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        starts.push((method, caps[2].to_string(), tags, i + 1));
        i += 1;
    }

    let mut tagline = String::new();
    if let Some(line) = lines.get(i) {
        let opens_block = !line.starts_with([' ', '\t']) && is_header(line);
        if !line.trim().is_empty() && !opens_block {
            tagline = line.trim().to_string();
            i += 1;
        }
    }

    let rest_start = i + 1;
    let rest = lines[i..].join("\n");
    let (description, request, responses) =
        parse_sections(session, &rest, scope).map_err(|(line, e)| locate(rest_start + line - 1, e))?;

    let endpoints: Vec<Endpoint> = starts
        .into_iter()
        .map(|(method, path, tags, line)| Endpoint {
            method,
            path,
            tags,
            tagline: tagline.clone(),
            description: description.clone(),
            request: request.clone(),
            responses: responses.clone(),
            file: file.to_path_buf(),
            line: comment.line + line - 1,
        })
        .collect();
    for e in &endpoints {
        debug!("Found endpoint {} {} at {}:{}", e.method, e.path, file.display(), e.line);
    }
    Ok(endpoints)
}

type Sections = (String, Request, BTreeMap<u16, Response>);

/// Parse everything after the start lines and tagline. Errors carry the line within `text`.
fn parse_sections(
    session: &mut Session,
    text: &str,
    scope: Option<&FileScope>,
) -> std::result::Result<Sections, (usize, Error)> {
    let blocks = get_blocks(text).map_err(|e| (1, e))?;

    let mut description = String::new();
    let mut request = Request {
        content_type: session.config.default_request_ct.clone(),
        ..Default::default()
    };
    let mut responses = BTreeMap::new();

    for block in blocks.iter() {
        let at = |e: Error| (block.line, e);
        let header = block.header.as_str();

        if header == DESC {
            let lines: Vec<&str> = block.body.lines().collect();
            description = dedent(&lines).trim().to_string();
        } else if let Some(caps) = SECTION_RE.captures(header) {
            let (ctx, slot) = match &caps[1] {
                "Path" => (RefContext::Path, &mut request.path),
                "Query" => (RefContext::Query, &mut request.query),
                _ => (RefContext::Form, &mut request.form),
            };
            if slot.is_some() {
                return Err(at(Error::DuplicateSection(caps[1].to_string())));
            }
            *slot = Some(parse_param_ref(session, ctx, &block.body, scope).map_err(at)?);
        } else if let Some(caps) = REQUEST_RE.captures(header) {
            if request.body.is_some() {
                return Err(at(Error::DuplicateSection("Request body".to_string())));
            }
            if let Some(ct) = caps.get(2) {
                request.content_type = ct.as_str().to_string();
            }
            request.body =
                Some(parse_param_ref(session, RefContext::RequestBody, &block.body, scope).map_err(at)?);
        } else if let Some(caps) = RESPONSE_RE.captures(header) {
            let code = match caps.get(2) {
                Some(m) => m
                    .as_str()
                    .parse::<u16>()
                    .map_err(|_| at(Error::Syntax(format!("invalid status code in {:?}", header))))?,
                None => 200,
            };
            if responses.contains_key(&code) {
                return Err(at(Error::DuplicateResponse(code)));
            }
            let content_type = caps
                .get(4)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| session.config.default_response_ct.clone());
            let body = parse_response_body(session, code, &block.body, scope).map_err(at)?;
            let description = body
                .as_ref()
                .map(|b| b.description.clone())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| reason_phrase(code));
            responses.insert(
                code,
                Response {
                    content_type,
                    description,
                    body,
                },
            );
        } else {
            return Err(at(Error::UnknownDirective(header.to_string())));
        }
    }

    Ok((description, request, responses))
}

fn reason_phrase(code: u16) -> String {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

/// Body of a `Response` section; `None` for `$empty`.
fn parse_response_body(
    session: &mut Session,
    code: u16,
    body: &str,
    scope: Option<&FileScope>,
) -> Result<Option<ParamRef>> {
    match body.trim() {
        "$empty" | "{empty}" => Ok(None),
        "$default" => {
            let lookup = session
                .config
                .default_responses
                .get(&code)
                .cloned()
                .ok_or_else(|| Error::Syntax(format!("no default response configured for {}", code)))?;
            let key = session.generator.get_or_build_reference(
                &mut session.program,
                RefContext::ResponseBody,
                &lookup,
                scope,
            )?;
            Ok(Some(ParamRef {
                description: String::new(),
                source: ParamSource::Reference(key),
            }))
        }
        _ => parse_param_ref(session, RefContext::ResponseBody, body, scope).map(Some),
    }
}

fn is_param_line(line: &str) -> bool {
    !line.starts_with([' ', '\t']) && PARAM_RE.is_match(line)
}

/// Parse a section body: a `$ref`, a bare type name, or a parameter list.
fn parse_param_ref(
    session: &mut Session,
    ctx: RefContext,
    body: &str,
    scope: Option<&FileScope>,
) -> Result<ParamRef> {
    let raw: Vec<&str> = body.lines().collect();
    let text = dedent(&raw);
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(0);
    let head = lines.get(first).map(|l| l.trim()).unwrap_or("");

    if matches!(head, "$empty" | "{empty}" | "$default") {
        return Err(Error::Syntax(format!("{} is only valid in a Response section", head)));
    }

    let lookup = match head.strip_prefix("$ref:") {
        Some(lookup) => Some(lookup.trim()),
        None if BARE_REF_RE.is_match(head) && !lines.iter().any(|l| is_param_line(l)) => Some(head),
        None => None,
    };

    if let Some(lookup) = lookup {
        if lookup.is_empty() {
            return Err(Error::Syntax("$ref without a type".to_string()));
        }
        let rest = &lines[first + 1..];
        if let Some(line) = rest.iter().find(|l| is_param_line(l)) {
            return Err(Error::ConflictingParamSpec {
                name: line.split(':').next().unwrap_or_default().to_string(),
                reason: "parameters listed next to a $ref".to_string(),
            });
        }
        let description = dedent(rest).trim().to_string();
        let key = session
            .generator
            .get_or_build_reference(&mut session.program, ctx, lookup, scope)?;
        return Ok(ParamRef {
            description,
            source: ParamSource::Reference(key),
        });
    }

    let mut description: Vec<&str> = Vec::new();
    let mut raw_params: Vec<(String, String)> = Vec::new();
    for line in &lines {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            // Continuation of the previous parameter
            match raw_params.last_mut() {
                Some((_, info)) => {
                    if !info.is_empty() {
                        info.push(' ');
                    }
                    info.push_str(line.trim());
                }
                None => description.push(line.trim()),
            }
            continue;
        }
        if line.starts_with("$ref:") {
            return Err(Error::ConflictingParamSpec {
                name: raw_params.last().map(|(n, _)| n.clone()).unwrap_or_default(),
                reason: "$ref listed next to parameters".to_string(),
            });
        }
        if let Some(caps) = PARAM_RE.captures(line) {
            let info = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            raw_params.push((caps[1].to_string(), info));
            continue;
        }
        if raw_params.is_empty() {
            description.push(line.trim());
            continue;
        }
        return Err(Error::Syntax(format!("invalid parameter line {:?}", line)));
    }

    let mut params = Vec::with_capacity(raw_params.len());
    for (name, info) in raw_params {
        params.push(build_param(session, ctx, &name, &info, scope)?);
    }

    Ok(ParamRef {
        description: description.join("\n"),
        source: ParamSource::Params(params),
    })
}

/// Literal kind named by a tag, e.g. `int` → `integer`, `[]bool` → `[]boolean`.
fn kind_keyword(tag: &str) -> Option<String> {
    if let Some(inner) = tag.strip_prefix("[]") {
        return kind_keyword(inner).map(|k| format!("[]{}", k));
    }
    let kind = match tag {
        "string" => "string",
        "int" | "integer" => "integer",
        "number" | "float" => "number",
        "bool" | "boolean" => "boolean",
        _ => return None,
    };
    Some(kind.to_string())
}

/// Build one inline parameter from `name: info {tags}`.
pub fn build_param(
    session: &mut Session,
    ctx: RefContext,
    name: &str,
    info: &str,
    scope: Option<&FileScope>,
) -> Result<Param> {
    let (info, tags) = parse_tags(info);
    let mut kind = None;
    let mut ref_lookup = None;
    let mut param_tags = ParamTags::default();

    for tag in &tags {
        match split_tag(tag) {
            ("required", None) => param_tags.required = true,
            ("optional", None) => param_tags.optional = true,
            ("omitempty", None) => param_tags.omitempty = true,
            ("readonly", None) => param_tags.readonly = true,
            ("enum", Some(v)) => {
                param_tags.enum_values = v.split_whitespace().map(str::to_string).collect()
            }
            ("default", Some(v)) => param_tags.default = Some(v.to_string()),
            ("range", Some(v)) => param_tags.range = Some(parse_range(v)?),
            ("$ref", Some(v)) if !v.is_empty() => ref_lookup = Some(v.to_string()),
            (k, None) => {
                if let Some(k) = kind_keyword(k) {
                    kind = Some(k);
                } else if let Some(format) = format_keyword(k) {
                    param_tags.format = Some(format.to_string());
                } else {
                    return Err(Error::UnknownTag {
                        field: name.to_string(),
                        tag: tag.clone(),
                    });
                }
            }
            _ => {
                return Err(Error::UnknownTag {
                    field: name.to_string(),
                    tag: tag.clone(),
                })
            }
        }
    }

    if let (Some(kind), Some(lookup)) = (&kind, &ref_lookup) {
        return Err(Error::ConflictingParamSpec {
            name: name.to_string(),
            reason: format!("both kind {} and $ref {}", kind, lookup),
        });
    }
    if let Some(lookup) = ref_lookup {
        param_tags.reference = Some(session.generator.get_or_build_reference(
            &mut session.program,
            ctx,
            &lookup,
            scope,
        )?);
    }

    Ok(Param {
        name: name.to_string(),
        info,
        kind,
        tags: param_tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::AstParser;
    use crate::program::Range;
    use crate::type_resolver::CrateRoot;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MODELS: &str = r#"
pub struct User { pub id: u64, pub name: String }
pub struct CreateUser { pub name: String }
pub struct ApiError { pub message: String }
pub struct Filter { pub q: String }
pub enum Kind { A, B }
"#;

    struct Fixture {
        _dir: TempDir,
        session: Session,
        scope: FileScope,
        file: PathBuf,
    }

    fn fixture(config: Config) -> Fixture {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("lib.rs");
        fs::write(&file, MODELS).unwrap();
        let crates = vec![CrateRoot::new("shop", dir.path())];
        let session = Session::new(config, crates).unwrap();
        let parsed = AstParser::parse_file(&file).unwrap();
        let scope = FileScope::new(&file, "shop", "shop", &parsed.syntax_tree.items);
        Fixture {
            _dir: dir,
            session,
            scope,
            file,
        }
    }

    impl Fixture {
        fn parse_at(&mut self, text: &str, line: usize) -> std::result::Result<Vec<Endpoint>, LocatedError> {
            let comment = DocComment {
                text: text.to_string(),
                line,
            };
            parse_comment(&mut self.session, &comment, &self.file, Some(&self.scope))
        }

        fn parse(&mut self, text: &str) -> std::result::Result<Vec<Endpoint>, LocatedError> {
            self.parse_at(text, 1)
        }

        fn parse_one(&mut self, text: &str) -> Endpoint {
            let mut endpoints = self.parse(text).unwrap();
            assert_eq!(endpoints.len(), 1);
            endpoints.remove(0)
        }
    }

    #[test]
    fn test_plain_comments_are_ignored() {
        let mut fx = fixture(Config::default());
        for text in [
            "",
            "Returns the user.",
            "get /users",
            "GET users",
            "GET  /users",
            "Some text\nGET /users\nResponse:\n  $empty",
        ] {
            assert_eq!(fx.parse(text).unwrap(), vec![], "{:?}", text);
        }
        assert!(fx.session.program.references.is_empty());
    }

    #[test]
    fn test_query_params_without_response() {
        let mut fx = fixture(Config::default());
        let comment = DocComment {
            text: "POST /path\n\nQuery:\n  foo: hello".to_string(),
            line: 1,
        };
        let endpoints = parse_directives(&mut fx.session, &comment, &fx.file, Some(&fx.scope)).unwrap();
        assert_eq!(endpoints.len(), 1);
        let endpoint = &endpoints[0];
        assert_eq!(endpoint.method, HttpMethod::Post);
        assert_eq!(endpoint.path, "/path");
        let query = endpoint.request.query.as_ref().unwrap();
        assert_eq!(
            query.params().unwrap(),
            &[Param {
                name: "foo".to_string(),
                info: "hello".to_string(),
                kind: None,
                tags: ParamTags::default(),
            }]
        );

        // The full parse insists on a response
        let err = fx.parse("POST /path\n\nQuery:\n  foo: hello").unwrap_err();
        assert!(matches!(err.error, Error::NoResponse));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_default_response_code() {
        let mut fx = fixture(Config::default());
        let endpoint = fx.parse_one("GET /users\n\nResponse:\n  $ref: crate.User");
        let codes: Vec<u16> = endpoint.responses.keys().copied().collect();
        assert_eq!(codes, vec![200]);

        let response = &endpoint.responses[&200];
        assert_eq!(response.description, "OK");
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.body.as_ref().unwrap().reference(), Some("shop.User"));
        assert!(fx.session.program.reference("shop.User").unwrap().is_complete());
    }

    #[test]
    fn test_full_endpoint() {
        let mut fx = fixture(Config::default());
        let text = "\
POST /users users admin
Create a user.

The name must be unique.
Second line.

Path:
  org: The organisation {required}
Request body (application/vnd.user+json):
  $ref: CreateUser
Response 201 (application/json):
  $ref: User
  The created user.
Response 409: $empty
";
        let endpoint = fx.parse_one(text);
        assert_eq!(endpoint.tags, vec!["users", "admin"]);
        assert_eq!(endpoint.tagline, "Create a user.");
        assert_eq!(endpoint.description, "The name must be unique.\nSecond line.");
        assert_eq!(endpoint.request.content_type, "application/vnd.user+json");
        assert_eq!(endpoint.request.body.as_ref().unwrap().reference(), Some("shop.CreateUser"));

        let path = endpoint.request.path.as_ref().unwrap().params().unwrap();
        assert_eq!(path[0].name, "org");
        assert_eq!(path[0].info, "The organisation");
        assert!(path[0].tags.required);

        let created = &endpoint.responses[&201];
        assert_eq!(created.description, "The created user.");
        assert_eq!(created.body.as_ref().unwrap().reference(), Some("shop.User"));

        let conflict = &endpoint.responses[&409];
        assert!(conflict.body.is_none());
        assert_eq!(conflict.description, "Conflict");
    }

    #[test]
    fn test_several_start_lines_share_the_body() {
        let mut fx = fixture(Config::default());
        let endpoints = fx
            .parse_at("GET /users/:id\nHEAD /users/:id\nFetch a user.\n\nResponse: {empty}", 20)
            .unwrap();
        let routes: Vec<(HttpMethod, &str, usize)> = endpoints
            .iter()
            .map(|e| (e.method, e.path.as_str(), e.line))
            .collect();
        assert_eq!(
            routes,
            vec![(HttpMethod::Get, "/users/:id", 20), (HttpMethod::Head, "/users/:id", 21)]
        );
        assert!(endpoints.iter().all(|e| e.tagline == "Fetch a user."));
    }

    #[test]
    fn test_header_right_after_start_line_is_not_a_tagline() {
        let mut fx = fixture(Config::default());
        let endpoint = fx.parse_one("DELETE /users/:id\nResponse 204: $empty");
        assert_eq!(endpoint.tagline, "");
        assert_eq!(endpoint.responses[&204].description, "No Content");
    }

    #[test]
    fn test_duplicate_sections() {
        let mut fx = fixture(Config::default());
        let err = fx
            .parse("GET /a\n\nResponse 200:\n  $empty\nResponse 200:\n  $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::DuplicateResponse(200)));
        assert_eq!(err.line, 5);

        let err = fx
            .parse("GET /a/:id\n\nPath:\n  id: The ID\nPath:\n  id: The ID\nResponse: $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::DuplicateSection(ref s) if s == "Path"));

        let err = fx
            .parse("POST /a\nRequest body: $ref: User\nRequest body: $ref: User\nResponse: $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::DuplicateSection(ref s) if s == "Request body"));
    }

    #[test]
    fn test_unknown_directive() {
        let mut fx = fixture(Config::default());
        let err = fx.parse("GET /a\n\nHeaders:\n  X-Foo: bar\nResponse: $empty").unwrap_err();
        assert!(matches!(err.error, Error::UnknownDirective(ref h) if h == "Headers:"));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_error_line_is_absolute() {
        let mut fx = fixture(Config::default());
        let err = fx
            .parse_at("GET /a\n\nResponse 404:\n  $ref: Missing", 40)
            .unwrap_err();
        assert!(matches!(err.error, Error::TypeNotFound { .. }));
        assert_eq!(err.line, 42);
        assert!(err.to_string().contains("lib.rs:42: "));
    }

    #[test]
    fn test_param_tags() {
        let mut fx = fixture(Config::default());
        let text = "\
GET /search

Query:
  hello: a desc {string, required}
  page: Page number, starting
    at one {int} {default: 1} {range: 1-}
  sort: {enum: asc desc} {optional}
  since: {date-time}
  ids: {[]int}
  filter: {$ref: Filter}
Response: $empty";
        let endpoint = fx.parse_one(text);
        let params = endpoint.request.query.as_ref().unwrap().params().unwrap().to_vec();

        assert_eq!(params[0].name, "hello");
        assert_eq!(params[0].info, "a desc");
        assert_eq!(params[0].kind.as_deref(), Some("string"));
        assert!(params[0].tags.required);

        assert_eq!(params[1].info, "Page number, starting at one");
        assert_eq!(params[1].kind.as_deref(), Some("integer"));
        assert_eq!(params[1].tags.default.as_deref(), Some("1"));
        assert_eq!(params[1].tags.range, Some(Range { min: Some(1), max: None }));

        assert_eq!(params[2].tags.enum_values, vec!["asc", "desc"]);
        assert!(params[2].tags.optional);
        assert_eq!(params[3].tags.format.as_deref(), Some("date-time"));
        assert_eq!(params[4].kind.as_deref(), Some("[]integer"));
        assert_eq!(params[5].tags.reference.as_deref(), Some("shop.Filter"));
        assert_eq!(fx.session.program.reference("shop.Filter").unwrap().context, RefContext::Query);
    }

    #[test]
    fn test_conflicting_param_specs() {
        let mut fx = fixture(Config::default());
        let err = fx
            .parse("GET /a\nQuery:\n  f: x {string} {$ref: Filter}\nResponse: $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::ConflictingParamSpec { ref name, .. } if name == "f"));
        assert!(fx.session.program.references.is_empty());

        let err = fx
            .parse("GET /a\nQuery:\n  f: x\n$ref: Filter\nResponse: $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::Syntax(_)));

        let err = fx
            .parse("GET /a\nQuery:\n  $ref: Filter\n  f: x\nResponse: $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::ConflictingParamSpec { .. }));

        let err = fx
            .parse("GET /a\nQuery:\n  f: x\n  $ref: Filter\nResponse: $empty")
            .unwrap_err();
        assert!(matches!(err.error, Error::ConflictingParamSpec { .. }));
    }

    #[test]
    fn test_unknown_param_tag() {
        let mut fx = fixture(Config::default());
        let err = fx.parse("GET /a\nQuery:\n  f: x {wat}\nResponse: $empty").unwrap_err();
        assert!(matches!(err.error, Error::UnknownTag { ref field, ref tag } if field == "f" && tag == "wat"));
    }

    #[test]
    fn test_bare_reference_and_description() {
        let mut fx = fixture(Config::default());
        let endpoint = fx.parse_one("GET /a\nQuery:\n  crate::Filter\nResponse:\n  User\n  Also a user.");
        assert_eq!(endpoint.request.query.as_ref().unwrap().reference(), Some("shop.Filter"));
        let ok = &endpoint.responses[&200];
        assert_eq!(ok.body.as_ref().unwrap().reference(), Some("shop.User"));
        assert_eq!(ok.description, "Also a user.");
    }

    #[test]
    fn test_section_description_before_params() {
        let mut fx = fixture(Config::default());
        let endpoint = fx.parse_one("GET /a\nQuery:\n  Filters for the list.\n  q: Search text\nResponse: $empty");
        let query = endpoint.request.query.as_ref().unwrap();
        assert_eq!(query.description, "Filters for the list.");
        assert_eq!(query.params().unwrap().len(), 1);
    }

    #[test]
    fn test_default_responses() {
        let mut config = Config::default();
        config.default_responses.insert(404, "ApiError".to_string());
        let mut fx = fixture(config);
        let endpoint = fx.parse_one("GET /a\nResponse 200: $empty\nResponse 404: $default");
        assert_eq!(endpoint.responses[&404].body.as_ref().unwrap().reference(), Some("shop.ApiError"));
        assert_eq!(endpoint.responses[&404].description, "Not Found");

        let err = fx.parse("GET /a\nResponse 500: $default").unwrap_err();
        assert!(matches!(err.error, Error::Syntax(_)));
    }

    #[test]
    fn test_empty_outside_response() {
        let mut fx = fixture(Config::default());
        let err = fx.parse("POST /a\nRequest body: $empty\nResponse: $empty").unwrap_err();
        assert!(matches!(err.error, Error::Syntax(_)));
    }

    #[test]
    fn test_reference_must_be_struct() {
        let mut fx = fixture(Config::default());
        let err = fx.parse("GET /a\nResponse: $ref: Kind").unwrap_err();
        assert!(matches!(err.error, Error::NotAStruct { .. }));
    }

    #[test]
    fn test_configured_content_types() {
        let mut config = Config::default();
        config.default_request_ct = "application/xml".to_string();
        config.default_response_ct = "text/plain".to_string();
        let mut fx = fixture(config);
        let endpoint = fx.parse_one("POST /a\nRequest body: $ref: User\nResponse 201: $ref: User");
        assert_eq!(endpoint.request.content_type, "application/xml");
        assert_eq!(endpoint.responses[&201].content_type, "text/plain");
    }
}
