//! Field type syntax reduced to the shapes the schema generator understands.

use std::collections::HashSet;

/// Builtin scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Bool,
    Char,
}

impl PrimitiveType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "String" | "str" => Some(PrimitiveType::String),
            "i8" => Some(PrimitiveType::I8),
            "i16" => Some(PrimitiveType::I16),
            "i32" => Some(PrimitiveType::I32),
            "i64" => Some(PrimitiveType::I64),
            "i128" => Some(PrimitiveType::I128),
            "isize" => Some(PrimitiveType::Isize),
            "u8" => Some(PrimitiveType::U8),
            "u16" => Some(PrimitiveType::U16),
            "u32" => Some(PrimitiveType::U32),
            "u64" => Some(PrimitiveType::U64),
            "u128" => Some(PrimitiveType::U128),
            "usize" => Some(PrimitiveType::Usize),
            "f32" => Some(PrimitiveType::F32),
            "f64" => Some(PrimitiveType::F64),
            "bool" => Some(PrimitiveType::Bool),
            "char" => Some(PrimitiveType::Char),
            _ => None,
        }
    }

    /// Schema type and format.
    pub fn schema_type(&self) -> (&'static str, Option<&'static str>) {
        match self {
            PrimitiveType::String | PrimitiveType::Char => ("string", None),
            PrimitiveType::I8
            | PrimitiveType::I16
            | PrimitiveType::I32
            | PrimitiveType::U8
            | PrimitiveType::U16
            | PrimitiveType::U32 => ("integer", Some("int32")),
            PrimitiveType::I64
            | PrimitiveType::I128
            | PrimitiveType::Isize
            | PrimitiveType::U64
            | PrimitiveType::U128
            | PrimitiveType::Usize => ("integer", Some("int64")),
            PrimitiveType::F32 => ("number", Some("float")),
            PrimitiveType::F64 => ("number", Some("double")),
            PrimitiveType::Bool => ("boolean", None),
        }
    }
}

/// A field type, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `Option<T>`, `Box<T>`, `&T` and friends
    Pointer(Box<TypeExpr>),
    Builtin(PrimitiveType),
    /// `Vec<u8>`, `[u8; N]`, `Bytes`
    Bytes,
    /// Single-segment name that is not a builtin, e.g. `User` or `Page<User>`
    Ident { name: String, args: Vec<TypeExpr> },
    /// Qualified name such as `models::User` or `chrono::DateTime<Utc>`
    Selector {
        package: String,
        name: String,
        args: Vec<TypeExpr>,
    },
    Array(Box<TypeExpr>),
    Map,
    /// `dyn Trait`, `impl Trait`, `serde_json::Value`
    Interface(String),
    /// Tuple type, documented as an object keyed by position
    Tuple(Vec<TypeExpr>),
    /// Generic parameter of the declaration being walked
    Param(String),
    /// Anything else; carries the source text for diagnostics
    Unsupported(String),
}

const POINTERS: &[&str] = &["Option", "Box", "Rc", "Arc", "Cow", "Cell", "RefCell"];
const ARRAYS: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet"];
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];
const STD_ROOTS: &[&str] = &["std", "core", "alloc"];

impl TypeExpr {
    /// Classify a syn type. `generics` are the type parameters in scope.
    pub fn from_syn(ty: &syn::Type, generics: &HashSet<String>) -> Self {
        match ty {
            syn::Type::Path(tp) if tp.qself.is_none() => Self::from_path(&tp.path, generics),
            syn::Type::Reference(r) => Self::pointer(Self::from_syn(&r.elem, generics)),
            syn::Type::Ptr(p) => Self::pointer(Self::from_syn(&p.elem, generics)),
            syn::Type::Paren(p) => Self::from_syn(&p.elem, generics),
            syn::Type::Group(g) => Self::from_syn(&g.elem, generics),
            syn::Type::Array(a) => Self::array(Self::from_syn(&a.elem, generics)),
            syn::Type::Slice(s) => Self::array(Self::from_syn(&s.elem, generics)),
            syn::Type::Tuple(t) if t.elems.is_empty() => TypeExpr::Unsupported("()".to_string()),
            syn::Type::Tuple(t) => {
                TypeExpr::Tuple(t.elems.iter().map(|e| Self::from_syn(e, generics)).collect())
            }
            syn::Type::TraitObject(_) => TypeExpr::Interface("dyn".to_string()),
            syn::Type::ImplTrait(_) => TypeExpr::Interface("impl".to_string()),
            other => TypeExpr::Unsupported(type_kind_name(other).to_string()),
        }
    }

    /// Parse type text as written in a directive (`models.User`, `crate::a::B`, `Page<User>`).
    pub fn parse_lookup(text: &str) -> Option<Self> {
        let text = text.trim();
        let normalized = if text.contains("::") {
            text.to_string()
        } else {
            text.replace('.', "::")
        };
        let ty: syn::Type = syn::parse_str(&normalized).ok()?;
        Some(Self::from_syn(&ty, &HashSet::new()))
    }

    fn pointer(inner: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(inner))
    }

    fn array(inner: TypeExpr) -> Self {
        match inner {
            TypeExpr::Builtin(PrimitiveType::U8) => TypeExpr::Bytes,
            other => TypeExpr::Array(Box::new(other)),
        }
    }

    fn from_path(path: &syn::Path, generics: &HashSet<String>) -> Self {
        let Some(last) = path.segments.last() else {
            return TypeExpr::Unsupported(String::new());
        };
        let name = last.ident.to_string();
        let args = generic_args(&last.arguments, generics);

        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let is_bare = segments.len() == 1 && path.leading_colon.is_none();
        let is_std = !is_bare && STD_ROOTS.contains(&segments[0].as_str());

        if is_bare && generics.contains(&name) {
            return TypeExpr::Param(name);
        }

        if is_bare || is_std {
            if let Some(p) = PrimitiveType::parse(&name) {
                return TypeExpr::Builtin(p);
            }
            if POINTERS.contains(&name.as_str()) {
                return match args.into_iter().next() {
                    Some(inner) => Self::pointer(inner),
                    None => TypeExpr::Unsupported(name),
                };
            }
            if ARRAYS.contains(&name.as_str()) {
                return match args.into_iter().next() {
                    Some(inner) => Self::array(inner),
                    None => TypeExpr::Unsupported(name),
                };
            }
            if MAPS.contains(&name.as_str()) {
                return TypeExpr::Map;
            }
            if name == "Any" {
                return TypeExpr::Interface(name);
            }
        }

        if is_bare {
            if name == "Bytes" {
                return TypeExpr::Bytes;
            }
            return TypeExpr::Ident { name, args };
        }

        let package = segments[..segments.len() - 1].join("::");
        match (package.as_str(), name.as_str()) {
            ("bytes", "Bytes") => TypeExpr::Bytes,
            ("serde_json", "Value") => TypeExpr::Interface("serde_json::Value".to_string()),
            ("indexmap", "IndexMap") => TypeExpr::Map,
            ("indexmap", "IndexSet") => match args.into_iter().next() {
                Some(inner) => Self::array(inner),
                None => TypeExpr::Unsupported(name),
            },
            _ => TypeExpr::Selector {
                package,
                name,
                args,
            },
        }
    }

    /// Short human readable form, used in diagnostics and placeholder fields.
    pub fn display(&self) -> String {
        match self {
            TypeExpr::Pointer(inner) => inner.display(),
            TypeExpr::Builtin(p) => p.schema_type().0.to_string(),
            TypeExpr::Bytes => "bytes".to_string(),
            TypeExpr::Ident { name, args } => with_args(name, args),
            TypeExpr::Selector {
                package,
                name,
                args,
            } => with_args(&format!("{}::{}", package, name), args),
            TypeExpr::Array(inner) => format!("[]{}", inner.display()),
            TypeExpr::Map => "map".to_string(),
            TypeExpr::Interface(kind) => kind.clone(),
            TypeExpr::Tuple(elems) => format!(
                "({})",
                elems.iter().map(|e| e.display()).collect::<Vec<_>>().join(", ")
            ),
            TypeExpr::Param(name) => name.clone(),
            TypeExpr::Unsupported(text) => text.clone(),
        }
    }
}

fn with_args(name: &str, args: &[TypeExpr]) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let inner: Vec<String> = args.iter().map(|a| a.display()).collect();
    format!("{}<{}>", name, inner.join(", "))
}

fn generic_args(args: &syn::PathArguments, generics: &HashSet<String>) -> Vec<TypeExpr> {
    match args {
        syn::PathArguments::AngleBracketed(ab) => ab
            .args
            .iter()
            .filter_map(|a| match a {
                syn::GenericArgument::Type(t) => Some(TypeExpr::from_syn(t, generics)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn type_kind_name(ty: &syn::Type) -> &'static str {
    match ty {
        syn::Type::BareFn(_) => "fn pointer",
        syn::Type::Infer(_) => "_",
        syn::Type::Macro(_) => "macro",
        syn::Type::Never(_) => "!",
        syn::Type::Path(_) => "qualified path",
        _ => "type",
    }
}

/// Names of the type parameters declared by `generics`.
pub fn generic_names(generics: &syn::Generics) -> HashSet<String> {
    generics.type_params().map(|p| p.ident.to_string()).collect()
}
