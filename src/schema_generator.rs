use crate::attrs::{apply_rename_all, rename_all, FieldAttrs};
use crate::config::{Config, MappedType};
use crate::error::{Error, Result};
use crate::parser::doc_text;
use crate::program::{Param, Program, RefContext, Reference};
use crate::tags::{format_keyword, parse_range, parse_tags, split_tag};
use crate::type_expr::{generic_names, TypeExpr};
use crate::type_resolver::{short_package, DeclItem, FileScope, ResolvedType, TypeResolver};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Aliases and newtypes followed before giving up on a type.
const MAX_INDIRECTION: usize = 32;

/// Instantiations of one generic struct that may be under construction at once.
const MAX_GENERIC_DEPTH: usize = 8;

/// Schema generator - converts Rust types to schemas
pub struct SchemaGenerator {
    /// Type resolver for looking up type definitions
    type_resolver: TypeResolver,
    /// Attribute consulted for serialized field names
    struct_tag: String,
    /// `package.Name` → primitive for well-known external types
    type_map: BTreeMap<String, MappedType>,
    indirection: usize,
    /// `package::Name` → instantiations of that struct being walked
    instantiations: HashMap<String, usize>,
}

/// Schema of a type, before it is rendered into an output document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub description: String,
    pub format: Option<String>,
    /// Default as written; output builders convert it to the schema's type
    pub default: Option<String>,
    pub enum_values: Vec<String>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub read_only: bool,
    /// Required property names, or for path/query/form fields the field's own name
    pub required: Vec<String>,
    /// Lookup key of the enum, newtype or alias an inline schema was derived from
    pub origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// `string`, `integer`, `number` or `boolean`
    Primitive(String),
    /// An object; no properties means any object
    Object(BTreeMap<String, Schema>),
    Array(Box<Schema>),
    /// Lookup key of a named type in the reference table
    Reference(String),
}

impl Default for SchemaKind {
    fn default() -> Self {
        SchemaKind::Object(BTreeMap::new())
    }
}

impl Schema {
    pub fn primitive(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            kind: SchemaKind::Primitive(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn object(properties: BTreeMap<String, Schema>) -> Self {
        Self {
            kind: SchemaKind::Object(properties),
            ..Default::default()
        }
    }

    /// An object without declared properties, used for maps and unbound generics.
    pub fn any_object() -> Self {
        Self::default()
    }

    pub fn array(items: Schema) -> Self {
        Self {
            kind: SchemaKind::Array(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn reference(lookup: impl Into<String>) -> Self {
        Self {
            kind: SchemaKind::Reference(lookup.into()),
            ..Default::default()
        }
    }

    /// JSON schema `type`, or `None` for references.
    pub fn schema_type(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Primitive(t) => Some(t),
            SchemaKind::Object(_) => Some("object"),
            SchemaKind::Array(_) => Some("array"),
            SchemaKind::Reference(_) => None,
        }
    }

    pub fn properties(&self) -> Option<&BTreeMap<String, Schema>> {
        match &self.kind {
            SchemaKind::Object(p) => Some(p),
            _ => None,
        }
    }

    pub fn reference_key(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Reference(k) => Some(k),
            _ => None,
        }
    }

    /// How this schema appears as a generic argument in a lookup key.
    ///
    /// Named inline types are keyed by where they come from, so two enums with
    /// the same shape (or an enum and a plain string) never share a key.
    pub fn key_fragment(&self) -> String {
        match (&self.kind, &self.origin) {
            (SchemaKind::Reference(k), _) => k.clone(),
            (_, Some(origin)) => origin.clone(),
            (SchemaKind::Primitive(t), None) => self.format.clone().unwrap_or_else(|| t.clone()),
            (SchemaKind::Object(props), None) if props.is_empty() => "object".to_string(),
            (SchemaKind::Object(props), None) => {
                let fields: Vec<String> = props
                    .iter()
                    .map(|(name, s)| format!("{}:{}", name, s.key_fragment()))
                    .collect();
                format!("({})", fields.join(","))
            }
            (SchemaKind::Array(items), None) => format!("[]{}", items.key_fragment()),
        }
    }

    /// Whether a reference to `key` appears anywhere in this schema.
    pub fn mentions(&self, key: &str) -> bool {
        match &self.kind {
            SchemaKind::Reference(k) => k == key,
            SchemaKind::Object(props) => props.values().any(|s| s.mentions(key)),
            SchemaKind::Array(items) => items.mentions(key),
            SchemaKind::Primitive(_) => false,
        }
    }

    fn with_origin(mut self, origin: String) -> Self {
        if !matches!(self.kind, SchemaKind::Reference(_)) {
            self.origin = Some(origin);
        }
        self
    }
}

impl From<&MappedType> for Schema {
    fn from(mapped: &MappedType) -> Self {
        Schema::primitive(&mapped.schema_type, mapped.format.as_deref())
    }
}

/// Lookup key of a named type: `short.Name`, with `[arg,...]` for generic instantiations.
pub fn lookup_key(package: &str, name: &str, args: &[Schema]) -> String {
    let mut key = format!("{}.{}", short_package(package), name);
    if !args.is_empty() {
        let args: Vec<String> = args.iter().map(Schema::key_fragment).collect();
        key.push('[');
        key.push_str(&args.join(","));
        key.push(']');
    }
    key
}

/// A struct field as it will be documented.
#[derive(Debug, Clone)]
struct FieldPlan {
    /// Serialized name
    name: String,
    doc: String,
    ty: TypeExpr,
    flatten: bool,
}

impl FieldPlan {
    fn param(&self) -> Param {
        Param {
            name: self.name.clone(),
            info: parse_tags(&self.doc).0,
            kind: Some(self.ty.display()),
            ..Default::default()
        }
    }
}

impl SchemaGenerator {
    /// Create a new SchemaGenerator with a TypeResolver
    pub fn new(type_resolver: TypeResolver, config: &Config) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            type_resolver,
            struct_tag: config.struct_tag.clone(),
            type_map: config.type_map(),
            indirection: 0,
            instantiations: HashMap::new(),
        }
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    /// Resolve a type named in a directive and make sure the reference table has it.
    ///
    /// `lookup` is the type as written (`User`, `models.User`, `crate::api::Page<User>`).
    /// Returns the lookup key. The type, after following aliases, must be a struct.
    pub fn get_or_build_reference(
        &mut self,
        program: &mut Program,
        context: RefContext,
        lookup: &str,
        current: Option<&FileScope>,
    ) -> Result<String> {
        debug!("Building reference {} for {}", lookup, context);

        let expr = TypeExpr::parse_lookup(lookup)
            .ok_or_else(|| Error::Syntax(format!("invalid type reference {:?}", lookup)))?;
        let (package, name, args) = match expr {
            TypeExpr::Ident { name, args } => (String::new(), name, args),
            TypeExpr::Selector {
                package,
                name,
                args,
            } => (package, name, args),
            _ => return Err(Error::Syntax(format!("{:?} does not name a type", lookup))),
        };

        let args = self.arg_schemas(program, context, current, &args, &HashMap::new(), lookup)?;
        let schema = self.named_schema(program, context, current, &package, &name, &args, false)?;
        match schema.kind {
            SchemaKind::Reference(key) => Ok(key),
            _ => Err(Error::Syntax(format!("{:?} does not name a struct", lookup))),
        }
    }

    /// Schema of a type appearing in a field, generic argument or alias.
    fn type_schema(
        &mut self,
        program: &mut Program,
        ctx: RefContext,
        scope: Option<&FileScope>,
        ty: &TypeExpr,
        env: &HashMap<String, Schema>,
        field: &str,
    ) -> Result<Schema> {
        match ty {
            TypeExpr::Pointer(inner) => self.type_schema(program, ctx, scope, inner, env, field),
            TypeExpr::Builtin(p) => {
                let (schema_type, format) = p.schema_type();
                Ok(Schema::primitive(schema_type, format))
            }
            TypeExpr::Bytes => Ok(Schema::primitive("string", None)),
            TypeExpr::Ident { name, args } => {
                let imported = scope.and_then(|s| s.imports.get(name));
                if let Some(mapped) = imported.and_then(|path| self.mapped_type(path)) {
                    return Ok(mapped);
                }
                let args = self.arg_schemas(program, ctx, scope, args, env, field)?;
                self.named_schema(program, ctx, scope, "", name, &args, true)
            }
            TypeExpr::Selector {
                package,
                name,
                args,
            } => {
                if let Some(mapped) = self.mapped_type(&format!("{}::{}", package, name)) {
                    return Ok(mapped);
                }
                let args = self.arg_schemas(program, ctx, scope, args, env, field)?;
                self.named_schema(program, ctx, scope, package, name, &args, true)
            }
            TypeExpr::Array(inner) => Ok(Schema::array(
                self.type_schema(program, ctx, scope, inner, env, field)?,
            )),
            TypeExpr::Map => Ok(Schema::any_object()),
            TypeExpr::Interface(path) => {
                self.mapped_type(path).ok_or_else(|| Error::UnsupportedType {
                    field: field.to_string(),
                    type_name: path.clone(),
                })
            }
            TypeExpr::Tuple(elems) => {
                let mut properties = BTreeMap::new();
                for (i, elem) in elems.iter().enumerate() {
                    let schema = self.type_schema(program, ctx, scope, elem, env, field)?;
                    properties.insert(i.to_string(), schema);
                }
                let mut schema = Schema::object(properties);
                schema.required = (0..elems.len()).map(|i| i.to_string()).collect();
                Ok(schema)
            }
            TypeExpr::Param(name) => Ok(env.get(name).cloned().unwrap_or_else(Schema::any_object)),
            TypeExpr::Unsupported(text) => Err(Error::UnsupportedType {
                field: field.to_string(),
                type_name: text.clone(),
            }),
        }
    }

    fn arg_schemas(
        &mut self,
        program: &mut Program,
        ctx: RefContext,
        scope: Option<&FileScope>,
        args: &[TypeExpr],
        env: &HashMap<String, Schema>,
        field: &str,
    ) -> Result<Vec<Schema>> {
        args.iter()
            .map(|a| self.type_schema(program, ctx, scope, a, env, field))
            .collect()
    }

    /// Well-known external type named by a `::` path, keyed `package.Name`.
    fn mapped_type(&self, path: &str) -> Option<Schema> {
        let (package, name) = path.rsplit_once("::")?;
        let key = format!("{}.{}", short_package(package), name);
        self.type_map.get(&key).map(Schema::from)
    }

    /// Schema of a named declaration.
    ///
    /// Structs become references. In field position, newtypes, unit enums and
    /// aliases of any type are inlined; from a directive only a struct is accepted.
    #[allow(clippy::too_many_arguments)]
    fn named_schema(
        &mut self,
        program: &mut Program,
        ctx: RefContext,
        scope: Option<&FileScope>,
        package: &str,
        name: &str,
        args: &[Schema],
        in_field: bool,
    ) -> Result<Schema> {
        let resolved = self.type_resolver.resolve_type(scope, package, name)?;
        let not_a_struct = |resolved: &ResolvedType| Error::NotAStruct {
            lookup: format!("{}.{}", short_package(&resolved.package), name),
            declaration: resolved.declaration.item.describe(),
            file: resolved.file.clone(),
        };

        let origin = lookup_key(&resolved.package, name, args);
        if self.indirection >= MAX_INDIRECTION {
            return Err(Error::Syntax(format!(
                "{} does not resolve to a concrete type",
                resolved.declaration.item.describe()
            )));
        }

        match &resolved.declaration.item {
            DeclItem::Struct(s) if !matches!(s.fields, syn::Fields::Unnamed(_)) => {
                self.struct_reference(program, ctx, &resolved, s, args)
            }
            DeclItem::Struct(s) if in_field && s.fields.len() == 1 => {
                let Some(field) = s.fields.iter().next() else {
                    return Err(not_a_struct(&resolved));
                };
                let env = bind_generics(&s.generics, args);
                let inner = TypeExpr::from_syn(&field.ty, &generic_names(&s.generics));
                debug!("{} is a newtype over {}", name, inner.display());
                let schema = self.indirect(|this| {
                    this.type_schema(program, ctx, Some(&*resolved.declaration.scope), &inner, &env, name)
                })?;
                Ok(schema.with_origin(origin))
            }
            DeclItem::Enum(e) if in_field => self
                .enum_schema(e)
                .map(|schema| schema.with_origin(origin))
                .ok_or_else(|| not_a_struct(&resolved)),
            DeclItem::Alias(a) => {
                let env = bind_generics(&a.generics, args);
                let target = TypeExpr::from_syn(&a.ty, &generic_names(&a.generics));
                let scope = Rc::clone(&resolved.declaration.scope);
                debug!("{} is an alias of {}", name, target.display());

                if in_field {
                    let schema =
                        self.indirect(|this| this.type_schema(program, ctx, Some(&*scope), &target, &env, name))?;
                    return Ok(schema.with_origin(origin));
                }

                let (package, target_name, target_args) = match strip_pointers(&target) {
                    TypeExpr::Ident { name, args } => (String::new(), name, args),
                    TypeExpr::Selector {
                        package,
                        name,
                        args,
                    } => (package.clone(), name, args),
                    _ => return Err(not_a_struct(&resolved)),
                };
                self.indirect(|this| {
                    let args = this.arg_schemas(program, ctx, Some(&*scope), target_args, &env, name)?;
                    this.named_schema(program, ctx, Some(&*scope), &package, target_name, &args, false)
                })
            }
            _ => Err(not_a_struct(&resolved)),
        }
    }

    fn indirect<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.indirection += 1;
        let result = f(self);
        self.indirection -= 1;
        result
    }

    /// Register a struct in the reference table and walk its fields.
    ///
    /// The entry goes in before the fields are walked, so a field that leads
    /// back to this struct finds it and stops there.
    fn struct_reference(
        &mut self,
        program: &mut Program,
        ctx: RefContext,
        resolved: &ResolvedType,
        item: &syn::ItemStruct,
        args: &[Schema],
    ) -> Result<Schema> {
        let name = item.ident.to_string();
        let key = lookup_key(&resolved.package, &name, args);
        if let Some(existing) = program.reference(&key) {
            if existing.package != resolved.package {
                warn!(
                    "{} in {} shares the key {} with the type from {}",
                    name, resolved.package, key, existing.package
                );
            }
            debug!("Reference {} already known", key);
            return Ok(Schema::reference(key));
        }

        let generic = format!("{}::{}", resolved.package, name);
        let depth = self.instantiations.get(&generic).copied().unwrap_or(0);
        if depth >= MAX_GENERIC_DEPTH {
            return Err(Error::Syntax(format!(
                "{} is instantiated with ever deeper generic arguments ({})",
                name, key
            )));
        }

        let generics = generic_names(&item.generics);
        let plans = self.field_plans(item, ctx, &generics);
        let info = doc_text(&item.attrs);
        program.insert_placeholder(Reference {
            name,
            package: resolved.package.clone(),
            file: resolved.file.clone(),
            lookup: key.clone(),
            info: info.clone(),
            context: ctx,
            fields: plans.iter().map(FieldPlan::param).collect(),
            schema: None,
        });

        let env = bind_generics(&item.generics, args);
        *self.instantiations.entry(generic.clone()).or_insert(0) += 1;
        let walked = self.walk_fields(program, ctx, &resolved.declaration.scope, &plans, &env);
        if let Some(count) = self.instantiations.get_mut(&generic) {
            *count -= 1;
        }
        match walked {
            Ok(mut schema) => {
                schema.description = info;
                debug!("Reference {} complete", key);
                program.complete(&key, schema);
                Ok(Schema::reference(key))
            }
            Err(e) => {
                debug!("Discarding reference {}: {}", key, e);
                program.discard(&key);
                Err(e)
            }
        }
    }

    fn field_plans(
        &self,
        item: &syn::ItemStruct,
        ctx: RefContext,
        generics: &std::collections::HashSet<String>,
    ) -> Vec<FieldPlan> {
        let rule = rename_all(&item.attrs, &self.struct_tag);
        let mut plans = Vec::new();

        for field in &item.fields {
            let Some(ident) = &field.ident else {
                continue;
            };
            let body = FieldAttrs::parse(&field.attrs, &self.struct_tag);
            let attrs = match ctx.attribute_name() {
                Some(attr_name) => {
                    let named = FieldAttrs::parse(&field.attrs, attr_name);
                    if named == FieldAttrs::default() {
                        body
                    } else {
                        named
                    }
                }
                None => body,
            };

            let skipped = attrs.skip
                || (ctx == RefContext::ResponseBody && attrs.skip_serializing)
                || (ctx == RefContext::RequestBody && attrs.skip_deserializing);
            if skipped {
                debug!("Skipping field {}", ident);
                continue;
            }

            let name = attrs
                .rename
                .unwrap_or_else(|| apply_rename_all(&ident.to_string(), rule.as_deref()));
            plans.push(FieldPlan {
                name,
                doc: doc_text(&field.attrs),
                ty: TypeExpr::from_syn(&field.ty, generics),
                flatten: attrs.flatten,
            });
        }
        plans
    }

    fn walk_fields(
        &mut self,
        program: &mut Program,
        ctx: RefContext,
        scope: &FileScope,
        plans: &[FieldPlan],
        env: &HashMap<String, Schema>,
    ) -> Result<Schema> {
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();

        for plan in plans {
            let mut schema = self.type_schema(program, ctx, Some(scope), &plan.ty, env, &plan.name)?;

            if plan.flatten {
                let inner = flattened(program, &plan.name, schema)?;
                if let SchemaKind::Object(props) = inner.kind {
                    properties.extend(props);
                }
                for name in inner.required {
                    if !required.contains(&name) {
                        required.push(name);
                    }
                }
                continue;
            }

            let (info, tags) = parse_tags(&plan.doc);
            if !info.is_empty() {
                schema.description = info;
            }
            apply_field_tags(&mut schema, &mut required, ctx, &plan.name, &tags)?;
            properties.insert(plan.name.clone(), schema);
        }

        let mut schema = Schema::object(properties);
        schema.required = required;
        Ok(schema)
    }

    /// Inline schema of an enum whose variants carry no data.
    fn enum_schema(&self, item: &syn::ItemEnum) -> Option<Schema> {
        if !item
            .variants
            .iter()
            .all(|v| matches!(v.fields, syn::Fields::Unit))
        {
            return None;
        }
        let rule = rename_all(&item.attrs, &self.struct_tag);
        let mut schema = Schema::primitive("string", None);
        schema.description = doc_text(&item.attrs);
        for variant in &item.variants {
            let attrs = FieldAttrs::parse(&variant.attrs, &self.struct_tag);
            if attrs.skip {
                continue;
            }
            let value = attrs
                .rename
                .unwrap_or_else(|| apply_rename_all(&variant.ident.to_string(), rule.as_deref()));
            schema.enum_values.push(value);
        }
        Some(schema)
    }
}

fn strip_pointers(ty: &TypeExpr) -> &TypeExpr {
    match ty {
        TypeExpr::Pointer(inner) => strip_pointers(inner),
        other => other,
    }
}

fn bind_generics(generics: &syn::Generics, args: &[Schema]) -> HashMap<String, Schema> {
    generics
        .type_params()
        .zip(args)
        .map(|(p, s)| (p.ident.to_string(), s.clone()))
        .collect()
}

/// Object schema whose properties a `flatten` field contributes.
fn flattened(program: &Program, field: &str, schema: Schema) -> Result<Schema> {
    if let SchemaKind::Object(_) = schema.kind {
        return Ok(schema);
    }
    match &schema.kind {
        SchemaKind::Reference(key) => program
            .reference(key)
            .and_then(|r| r.schema.clone())
            .ok_or_else(|| Error::Syntax(format!("field {:?} flattens {} into itself", field, key))),
        _ => Err(Error::UnsupportedType {
            field: field.to_string(),
            type_name: format!("flattened {}", schema.schema_type().unwrap_or("value")),
        }),
    }
}

/// Apply the `{..}` tags from a field's doc comment.
fn apply_field_tags(
    schema: &mut Schema,
    parent_required: &mut Vec<String>,
    ctx: RefContext,
    field: &str,
    tags: &[String],
) -> Result<()> {
    for tag in tags {
        let (key, value) = split_tag(tag);
        match (key, value) {
            ("required", None) => {
                // Parameter bags are flattened into parameter lists, so the
                // flag stays on the field itself.
                if ctx.is_param_bag() {
                    schema.required.push(field.to_string());
                } else if !parent_required.iter().any(|r| r == field) {
                    parent_required.push(field.to_string());
                }
            }
            ("optional", None) => {}
            ("readonly", None) => schema.read_only = true,
            ("omitempty", None) => {
                return Err(Error::NotImplemented(format!("omitempty tag on field {:?}", field)))
            }
            ("enum", Some(v)) => schema.enum_values = v.split_whitespace().map(str::to_string).collect(),
            ("default", Some(v)) => schema.default = Some(v.to_string()),
            ("range", Some(v)) => {
                let range = parse_range(v)?;
                schema.minimum = range.min;
                schema.maximum = range.max;
            }
            (k, None) => match format_keyword(k) {
                Some(format) => schema.format = Some(format.to_string()),
                None => {
                    return Err(Error::UnknownTag {
                        field: field.to_string(),
                        tag: tag.clone(),
                    })
                }
            },
            _ => {
                return Err(Error::UnknownTag {
                    field: field.to_string(),
                    tag: tag.clone(),
                })
            }
        }
    }
    Ok(())
}
