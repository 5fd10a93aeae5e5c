//! Serialization attributes on declarations and fields.
//!
//! Field names in generated schemas follow the serialization attribute
//! (`#[serde(..)]` by default): `rename`, `skip`, `skip_serializing`,
//! `skip_deserializing`, `flatten`, and the container's `rename_all`.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use log::warn;

/// Attributes on one field or enum variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAttrs {
    pub rename: Option<String>,
    pub skip: bool,
    pub skip_serializing: bool,
    pub skip_deserializing: bool,
    pub flatten: bool,
}

impl FieldAttrs {
    /// Read the attributes named `attr_name`, e.g. `serde` or `query`.
    ///
    /// Keys that don't affect the schema (`default`, `with`, `alias`, ..) are ignored.
    pub fn parse(attrs: &[syn::Attribute], attr_name: &str) -> Self {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(attr_name)) {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(syn::Token![=]) {
                        let s: syn::LitStr = meta.value()?.parse()?;
                        out.rename = Some(s.value());
                    } else {
                        // rename(serialize = "..", deserialize = "..")
                        meta.parse_nested_meta(|inner| {
                            let s: syn::LitStr = inner.value()?.parse()?;
                            if inner.path.is_ident("serialize") {
                                out.rename = Some(s.value());
                            }
                            Ok(())
                        })?;
                    }
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.path.is_ident("skip_serializing") {
                    out.skip_serializing = true;
                } else if meta.path.is_ident("skip_deserializing") {
                    out.skip_deserializing = true;
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                } else {
                    skip_meta_value(&meta)?;
                }
                Ok(())
            });
            if let Err(e) = result {
                warn!("Ignoring malformed #[{}] attribute: {}", attr_name, e);
            }
        }
        out
    }
}

/// Container-level `rename_all`, if any.
pub fn rename_all(attrs: &[syn::Attribute], attr_name: &str) -> Option<String> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident(attr_name)) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if meta.input.peek(syn::Token![=]) {
                    let s: syn::LitStr = meta.value()?.parse()?;
                    found = Some(s.value());
                } else {
                    meta.parse_nested_meta(|inner| {
                        let s: syn::LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            found = Some(s.value());
                        }
                        Ok(())
                    })?;
                }
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });
    }
    found
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta_value(&inner))?;
    }
    Ok(())
}

/// Apply a `rename_all` rule to a field or variant name.
pub fn apply_rename_all(name: &str, rule: Option<&str>) -> String {
    let name = strip_raw_prefix(name);
    match rule {
        Some("lowercase") => name.to_lowercase(),
        Some("UPPERCASE") => name.to_uppercase(),
        Some("PascalCase") => name.to_upper_camel_case(),
        Some("camelCase") => name.to_lower_camel_case(),
        Some("snake_case") => name.to_snake_case(),
        Some("SCREAMING_SNAKE_CASE") => name.to_shouty_snake_case(),
        Some("kebab-case") => name.to_kebab_case(),
        Some("SCREAMING-KEBAB-CASE") => name.to_shouty_kebab_case(),
        Some(other) => {
            warn!("Unknown rename_all rule {:?}, keeping {}", other, name);
            name.to_string()
        }
        None => name.to_string(),
    }
}

/// `r#type` → `type`
pub fn strip_raw_prefix(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}
